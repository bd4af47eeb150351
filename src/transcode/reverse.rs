//! The "down" transform: flattened resource ancestry back into relationship rows.

use serde::{Deserialize, Serialize};

use crate::{
    ancestry::Ancestry,
    config::{ReversePostStep, TranscodeConfig},
    diagnostic::Diagnostic,
    error::TranscodeError,
    forest::ResourceForest,
    properties::{NewEdge, Subject},
    resolver::ReverseResolver,
    store::{EdgeStore, ResourceStore},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseReport {
    pub resources_scanned: usize,
    pub edges_created: usize,
    pub ancestry_cleared: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ReverseTranscoder {
    config: TranscodeConfig,
}

impl ReverseTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        ReverseTranscoder { config }
    }

    /// Rebuild one governed edge per resource in the implied forest.
    ///
    /// Existing governed edges are not consulted, so running this twice duplicates them; the
    /// caller must invoke it at most once per migration. The forest and its order are computed
    /// before the first insert, so a cycle leaves both stores untouched.
    #[tracing::instrument(skip_all, fields(kind = %self.config.edge_kind))]
    pub async fn run<R, E>(
        &self,
        resources: &mut R,
        edges: &mut E,
    ) -> Result<ReverseReport, TranscodeError>
    where
        R: ResourceStore,
        E: EdgeStore,
    {
        let listed = resources
            .find_resources(&self.config.subject_type)
            .await?;
        let mut report = ReverseReport {
            resources_scanned: listed.len(),
            ..Default::default()
        };

        let forest = ResourceForest::build(
            &listed,
            self.config.missing_ancestors,
            &mut report.diagnostics,
        )?;
        let order = forest.ancestor_first()?;

        let mut remap = ReverseResolver::new();
        for resource in order {
            let chain = remap.resolve_reverse(resource, forest.chain(&resource))?;
            let edge = edges
                .create_edge(NewEdge::new(
                    self.config.edge_kind.clone(),
                    Subject::new(self.config.subject_type.clone(), resource),
                    Ancestry::encode(chain.as_ref()),
                ))
                .await?;
            tracing::debug!(
                "{} -> {} (ancestry {:?})",
                resource.label(),
                edge.id.label(),
                edge.ancestry
            );
            remap.record(resource, edge.id);
            report.edges_created += 1;
        }

        if self.config.reverse_post_step == ReversePostStep::Clear {
            for resource in listed.iter().filter(|r| r.ancestry.is_some()) {
                resources.set_ancestry(resource.id, None).await?;
                report.ancestry_cleared += 1;
            }
        }

        tracing::info!(
            "Rebuilt {} governed edges from {} resources",
            report.edges_created,
            report.resources_scanned
        );
        Ok(report)
    }
}
