//! Forest construction for both transcoding directions.
//!
//! - [`ForestLoader`] / [`GovernedEdges`]: the governed subset of the edge store, indexed by
//!   edge id. Rows of any other `(kind, subject_type)` never enter this structure.
//! - [`ResourceForest`]: the forest implied by flattened resource ancestry, held as a petgraph
//!   `GraphMap` with an arc from every chain member to the node that names it. It yields the
//!   ancestor-before-descendant order the reverse pass needs to assign edge ids.

use petgraph::{graphmap::DiGraphMap, Direction};
use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use crate::{
    ancestry::Ancestry,
    config::{MissingAncestorPolicy, TranscodeConfig},
    diagnostic::Diagnostic,
    error::TranscodeError,
    properties::{Edge, EdgeId, Resource, ResourceId},
    store::EdgeStore,
};

#[derive(Debug, Clone)]
pub struct ForestLoader {
    kind: String,
    subject_type: String,
}

impl ForestLoader {
    pub fn new(kind: impl Into<String>, subject_type: impl Into<String>) -> Self {
        ForestLoader {
            kind: kind.into(),
            subject_type: subject_type.into(),
        }
    }

    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self::new(config.edge_kind.clone(), config.subject_type.clone())
    }

    #[tracing::instrument(skip(self, store), fields(kind = %self.kind, subject_type = %self.subject_type))]
    pub async fn load<E: EdgeStore>(&self, store: &E) -> Result<GovernedEdges, TranscodeError> {
        let rows = store.find_edges(&self.kind, &self.subject_type).await?;
        let governed = self.collect(rows);
        tracing::debug!("Loaded {} governed edges", governed.len());
        Ok(governed)
    }

    /// Index `rows` by id, dropping anything outside the governed pair.
    pub fn collect<I: IntoIterator<Item = Edge>>(&self, rows: I) -> GovernedEdges {
        let edges = rows
            .into_iter()
            .filter(|edge| edge.is_governed(&self.kind, &self.subject_type))
            .map(|edge| (edge.id, edge))
            .collect();
        GovernedEdges { edges }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GovernedEdges {
    edges: BTreeMap<EdgeId, Edge>,
}

impl GovernedEdges {
    pub fn get(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn ids(&self) -> BTreeSet<EdgeId> {
        self.edges.keys().copied().collect()
    }

    /// Governed edges per subject resource, each list in ascending edge id order.
    pub fn by_subject(&self) -> BTreeMap<ResourceId, Vec<EdgeId>> {
        let mut subjects: BTreeMap<ResourceId, Vec<EdgeId>> = BTreeMap::new();
        for edge in self.edges.values() {
            subjects
                .entry(edge.subject.subject_id)
                .or_default()
                .push(edge.id);
        }
        subjects
    }
}

/// Lineage implied by the flattened `ancestry` column of governed resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceForest {
    chains: BTreeMap<ResourceId, Option<Ancestry<ResourceId>>>,
    graph: DiGraphMap<ResourceId, ()>,
    synthesized: BTreeSet<ResourceId>,
}

impl ResourceForest {
    /// Build the forest of every resource that needs an edge: each resource with a non-null
    /// chain, plus every id named inside any chain.
    ///
    /// A named id that is not among `resources` takes the chain implied by the lowest-id
    /// resource naming it, unless `policy` rejects such ids. A named resource keeps its own
    /// chain; a descendant implying a different one is a [`Diagnostic::ConflictingChain`], or
    /// an error under [`MissingAncestorPolicy::Reject`].
    pub fn build(
        resources: &[Resource],
        policy: MissingAncestorPolicy,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self, TranscodeError> {
        let mut own: BTreeMap<ResourceId, Option<Ancestry<ResourceId>>> = BTreeMap::new();
        for resource in resources {
            let chain = Ancestry::<ResourceId>::parse(resource.ancestry.as_deref())?;
            own.insert(resource.id, chain);
        }

        let mut forest = ResourceForest::default();

        for (id, chain) in own.iter() {
            let Some(chain) = chain else {
                continue;
            };
            forest.chains.insert(*id, Some(chain.clone()));
            for (idx, ancestor) in chain.iter().enumerate() {
                let implied = chain.suffix_after(idx);
                if let Some(ancestor_chain) = own.get(ancestor) {
                    forest.chains.insert(*ancestor, ancestor_chain.clone());
                    if *ancestor_chain != implied {
                        if policy == MissingAncestorPolicy::Reject {
                            return Err(TranscodeError::dangling(id.label(), ancestor.label()));
                        }
                        Diagnostic::ConflictingChain {
                            resource: *ancestor,
                            kept: Ancestry::encode(ancestor_chain.as_ref()),
                            ignored: Ancestry::encode(implied.as_ref()),
                        }
                        .emit(diagnostics);
                    }
                    continue;
                }
                if policy == MissingAncestorPolicy::Reject {
                    return Err(TranscodeError::dangling(id.label(), ancestor.label()));
                }
                if forest.synthesized.insert(*ancestor) {
                    Diagnostic::SynthesizedAncestor {
                        resource: *ancestor,
                        referenced_by: *id,
                    }
                    .emit(diagnostics);
                    forest.chains.insert(*ancestor, implied);
                } else if forest.chains.get(ancestor) != Some(&implied) {
                    Diagnostic::ConflictingChain {
                        resource: *ancestor,
                        kept: forest
                            .chains
                            .get(ancestor)
                            .and_then(|c| Ancestry::encode(c.as_ref())),
                        ignored: Ancestry::encode(implied.as_ref()),
                    }
                    .emit(diagnostics);
                }
            }
        }

        for id in forest.chains.keys() {
            forest.graph.add_node(*id);
        }
        for (id, chain) in forest.chains.iter() {
            for ancestor in chain.iter().flatten() {
                forest.graph.add_edge(*ancestor, *id, ());
            }
        }

        tracing::debug!(
            "Built resource forest: {} nodes, {} dependencies, {} synthesized",
            forest.graph.node_count(),
            forest.graph.edge_count(),
            forest.synthesized.len()
        );
        Ok(forest)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.chains.contains_key(id)
    }

    /// The chain to encode for `id`. `None` for roots and for ids outside the forest.
    pub fn chain(&self, id: &ResourceId) -> Option<&Ancestry<ResourceId>> {
        self.chains.get(id).and_then(|c| c.as_ref())
    }

    pub fn synthesized(&self) -> &BTreeSet<ResourceId> {
        &self.synthesized
    }

    /// Every node, each one after all members of its own chain. Ties go to the lowest id.
    ///
    /// Nodes on (or below) a cycle can never become ready; the lowest such node is reported as
    /// a dangling reference to the first member of its chain that was never placed.
    pub fn ancestor_first(&self) -> Result<Vec<ResourceId>, TranscodeError> {
        let mut pending: BTreeMap<ResourceId, usize> = self
            .graph
            .nodes()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();
        let mut ready: BinaryHeap<Reverse<ResourceId>> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for descendant in self.graph.neighbors_directed(id, Direction::Outgoing) {
                if let Some(count) = pending.get_mut(&descendant) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(descendant));
                    }
                }
            }
        }

        if order.len() < pending.len() {
            let placed: BTreeSet<ResourceId> = order.iter().copied().collect();
            pending.retain(|id, _| !placed.contains(id));
            if let Some(stuck) = pending.keys().next() {
                let missing = self
                    .chain(stuck)
                    .and_then(|chain| chain.iter().find(|a| !placed.contains(a)))
                    .map(|a| a.label())
                    .unwrap_or_else(|| "an ancestor".to_string());
                return Err(TranscodeError::dangling(stuck.label(), missing));
            }
        }
        Ok(order)
    }
}
