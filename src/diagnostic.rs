//! Non-fatal observations collected while transcoding.
//!
//! None of these stop a run. Each one is logged with `tracing::warn!` when it is recorded and
//! kept on the run's report so that a driver can surface it after the fact.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::properties::{EdgeId, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// More than one governed edge targets the same resource. The edge processed last (highest
    /// id) decides the resource's ancestry.
    DuplicateSubject {
        resource: ResourceId,
        edges: Vec<EdgeId>,
    },
    /// A resource id appears inside some ancestry chain but is not a governed resource in the
    /// resource store. An edge was created for it anyway, with the chain implied by the
    /// referencing resource.
    SynthesizedAncestor {
        resource: ResourceId,
        referenced_by: ResourceId,
    },
    /// Two chains disagree about the ancestors of a resource. A governed resource keeps its own
    /// chain; a synthesized one keeps the chain of its lowest-id referencing resource.
    ConflictingChain {
        resource: ResourceId,
        kept: Option<String>,
        ignored: Option<String>,
    },
}

impl Diagnostic {
    pub(crate) fn emit(self, sink: &mut Vec<Diagnostic>) {
        tracing::warn!("{}", self);
        sink.push(self);
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateSubject { resource, edges } => write!(
                f,
                "{} is the subject of {} governed edges ({}); the last one wins",
                resource.label(),
                edges.len(),
                edges
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Diagnostic::SynthesizedAncestor {
                resource,
                referenced_by,
            } => write!(
                f,
                "{} is named in the ancestry of {} but is not a governed resource",
                resource.label(),
                referenced_by.label()
            ),
            Diagnostic::ConflictingChain {
                resource,
                kept,
                ignored,
            } => write!(
                f,
                "{} has conflicting implied ancestry: kept {:?}, ignored {:?}",
                resource.label(),
                kept,
                ignored
            ),
        }
    }
}
