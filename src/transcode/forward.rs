//! The "up" transform: relationship rows into flattened resource ancestry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    ancestry::Ancestry,
    config::TranscodeConfig,
    diagnostic::Diagnostic,
    error::TranscodeError,
    forest::{ForestLoader, GovernedEdges},
    properties::ResourceId,
    resolver::PathResolver,
    store::{EdgeStore, ResourceStore},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardReport {
    pub governed_edges: usize,
    pub resources_updated: usize,
    pub edges_deleted: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ForwardTranscoder {
    config: TranscodeConfig,
}

impl ForwardTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        ForwardTranscoder { config }
    }

    /// Flatten every governed edge onto its subject, then delete the governed edge set.
    ///
    /// Every path is resolved and every subject looked up before the first write, so a
    /// dangling reference or a missing subject leaves both stores untouched. A second run finds no governed edges and does nothing.
    #[tracing::instrument(skip_all, fields(kind = %self.config.edge_kind))]
    pub async fn run<R, E>(
        &self,
        resources: &mut R,
        edges: &mut E,
    ) -> Result<ForwardReport, TranscodeError>
    where
        R: ResourceStore,
        E: EdgeStore,
    {
        let governed = ForestLoader::from_config(&self.config)
            .load(&*edges)
            .await?;
        let mut report = ForwardReport {
            governed_edges: governed.len(),
            ..Default::default()
        };
        if governed.is_empty() {
            tracing::info!("No governed edges found; nothing to flatten");
            return Ok(report);
        }

        let plan = self.plan(&governed, &mut report.diagnostics)?;
        for resource in plan.keys() {
            resources.get_resource(*resource).await?;
        }

        for (resource, chain) in plan.iter() {
            let encoded = Ancestry::encode(chain.as_ref());
            tracing::debug!("{} ancestry <- {:?}", resource.label(), encoded);
            resources.set_ancestry(*resource, encoded).await?;
            report.resources_updated += 1;
        }

        let ids = governed.ids();
        edges.delete_edges(&ids).await?;
        report.edges_deleted = ids.len();

        tracing::info!(
            "Flattened {} governed edges onto {} resources",
            report.governed_edges,
            report.resources_updated
        );
        Ok(report)
    }

    /// Resolve every governed edge to the chain its subject should carry.
    ///
    /// Edges are visited in ascending id order; when several edges name the same subject the
    /// highest id wins.
    pub fn plan(
        &self,
        governed: &GovernedEdges,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<BTreeMap<ResourceId, Option<Ancestry<ResourceId>>>, TranscodeError> {
        let resolver = PathResolver::new(governed);
        let mut plan = BTreeMap::new();
        for edge in governed.iter() {
            let chain = resolver.resolve(edge)?;
            plan.insert(edge.subject.subject_id, chain);
        }

        for (resource, edges) in governed.by_subject() {
            if edges.len() > 1 {
                Diagnostic::DuplicateSubject { resource, edges }.emit(diagnostics);
            }
        }
        Ok(plan)
    }
}
