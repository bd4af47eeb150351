//! Translation of materialized paths between the two identifier spaces.
//!
//! [`PathResolver`] reads an edge's path of edge ids and answers with the subjects of those
//! edges. [`ReverseResolver`] goes the other way using the ids of edges created earlier in
//! the same run. Neither ever shortens a chain: an id it cannot translate is an error.

use std::collections::BTreeMap;

use crate::{
    ancestry::Ancestry,
    error::TranscodeError,
    forest::GovernedEdges,
    properties::{Edge, EdgeId, ResourceId},
};

/// Edge-id paths to resource-id paths, over a fixed governed set.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    governed: &'a GovernedEdges,
}

impl<'a> PathResolver<'a> {
    pub fn new(governed: &'a GovernedEdges) -> Self {
        PathResolver { governed }
    }

    /// `[a1, .., an]` becomes `[subject(a1), .., subject(an)]`; a root edge becomes `None`.
    pub fn resolve(&self, edge: &Edge) -> Result<Option<Ancestry<ResourceId>>, TranscodeError> {
        let Some(chain) = Ancestry::<EdgeId>::parse(edge.ancestry.as_deref())? else {
            return Ok(None);
        };
        let resolved = chain.try_map(|ancestor| {
            self.governed
                .get(ancestor)
                .map(|e| e.subject.subject_id)
                .ok_or_else(|| TranscodeError::dangling(edge.id.label(), ancestor.label()))
        })?;
        Ok(Some(resolved))
    }
}

/// Resource-id paths to edge-id paths, through edges created so far in this run.
#[derive(Debug, Clone, Default)]
pub struct ReverseResolver {
    created: BTreeMap<ResourceId, EdgeId>,
}

impl ReverseResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the edge just created for `resource`.
    pub fn record(&mut self, resource: ResourceId, edge: EdgeId) {
        if let Some(previous) = self.created.insert(resource, edge) {
            tracing::warn!(
                "{} already had {}; now mapped to {}",
                resource.label(),
                previous.label(),
                edge.label()
            );
        }
    }

    pub fn edge_for(&self, resource: &ResourceId) -> Option<EdgeId> {
        self.created.get(resource).copied()
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Translate the chain of `resource`. Every member must already have an edge.
    pub fn resolve_reverse(
        &self,
        resource: ResourceId,
        chain: Option<&Ancestry<ResourceId>>,
    ) -> Result<Option<Ancestry<EdgeId>>, TranscodeError> {
        let Some(chain) = chain else {
            return Ok(None);
        };
        let resolved = chain.try_map(|ancestor| {
            self.edge_for(ancestor)
                .ok_or_else(|| TranscodeError::dangling(resource.label(), ancestor.label()))
        })?;
        Ok(Some(resolved))
    }
}
