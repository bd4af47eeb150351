//! Forward and reverse transcoding, plus a small façade for drivers.
//!
//! A driver picks a [`Direction`] and hands [`Transcoder::run`] one resource store and one
//! edge store. Each run loads a fresh snapshot, computes, and writes back; nothing is cached
//! between runs. Transaction boundaries belong to the driver: wrap each run in one atomic
//! transaction so that a failure leaves the prior representation intact.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{
    config::TranscodeConfig,
    diagnostic::Diagnostic,
    error::TranscodeError,
    forest::ForestLoader,
    store::{EdgeStore, ResourceStore},
};

mod forward;
mod reverse;

pub use forward::{ForwardReport, ForwardTranscoder};
pub use reverse::{ReverseReport, ReverseTranscoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Relationship rows to flattened resource ancestry.
    Up,
    /// Flattened resource ancestry to relationship rows.
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "forward" => Ok(Direction::Up),
            "down" | "reverse" => Ok(Direction::Down),
            other => Err(TranscodeError::Config(format!(
                "unknown direction '{other}', expected 'up' or 'down'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscodeReport {
    Forward(ForwardReport),
    Reverse(ReverseReport),
}

impl TranscodeReport {
    pub fn direction(&self) -> Direction {
        match self {
            TranscodeReport::Forward(_) => Direction::Up,
            TranscodeReport::Reverse(_) => Direction::Down,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TranscodeReport::Forward(r) => &r.diagnostics,
            TranscodeReport::Reverse(r) => &r.diagnostics,
        }
    }
}

impl Display for TranscodeReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TranscodeReport::Forward(r) => write!(
                f,
                "up: {} governed edges, {} resources updated, {} edges deleted",
                r.governed_edges, r.resources_updated, r.edges_deleted
            )?,
            TranscodeReport::Reverse(r) => write!(
                f,
                "down: {} resources scanned, {} edges created, {} ancestry values cleared",
                r.resources_scanned, r.edges_created, r.ancestry_cleared
            )?,
        }
        for diagnostic in self.diagnostics() {
            write!(f, "\n  warning: {diagnostic}")?;
        }
        Ok(())
    }
}

/// Which representation currently holds the governed hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    Empty,
    EdgeTable,
    Flattened,
    /// Both representations hold data; one direction was probably interrupted or run twice.
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub governed_edges: usize,
    pub total_edges: usize,
    pub resources: usize,
    pub resources_with_ancestry: usize,
}

impl Status {
    pub fn representation(&self) -> Representation {
        match (self.governed_edges > 0, self.resources_with_ancestry > 0) {
            (false, false) => Representation::Empty,
            (true, false) => Representation::EdgeTable,
            (false, true) => Representation::Flattened,
            (true, true) => Representation::Mixed,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} governed of {} edges, {} of {} resources carry ancestry",
            self.representation(),
            self.governed_edges,
            self.total_edges,
            self.resources_with_ancestry,
            self.resources
        )
    }
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    config: TranscodeConfig,
}

impl Transcoder {
    pub fn new(config: TranscodeConfig) -> Result<Self, TranscodeError> {
        config.validate()?;
        Ok(Transcoder { config })
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    pub async fn run<R, E>(
        &self,
        direction: Direction,
        resources: &mut R,
        edges: &mut E,
    ) -> Result<TranscodeReport, TranscodeError>
    where
        R: ResourceStore,
        E: EdgeStore,
    {
        tracing::info!("Running {} transform", direction);
        match direction {
            Direction::Up => ForwardTranscoder::new(self.config.clone())
                .run(resources, edges)
                .await
                .map(TranscodeReport::Forward),
            Direction::Down => ReverseTranscoder::new(self.config.clone())
                .run(resources, edges)
                .await
                .map(TranscodeReport::Reverse),
        }
    }

    pub async fn status<R, E>(&self, resources: &R, edges: &E) -> Result<Status, TranscodeError>
    where
        R: ResourceStore,
        E: EdgeStore,
    {
        let governed = ForestLoader::from_config(&self.config).load(edges).await?;
        let listed = resources.find_resources(&self.config.subject_type).await?;
        Ok(Status {
            governed_edges: governed.len(),
            total_edges: edges.count_edges().await?,
            resources: listed.len(),
            resources_with_ancestry: listed.iter().filter(|r| r.ancestry.is_some()).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("Reverse".parse::<Direction>().unwrap(), Direction::Down);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::Down.to_string(), "down");
    }

    #[test]
    fn test_representation_from_counts() {
        let mut status = Status {
            governed_edges: 0,
            total_edges: 3,
            resources: 4,
            resources_with_ancestry: 0,
        };
        assert_eq!(status.representation(), Representation::Empty);
        status.governed_edges = 2;
        assert_eq!(status.representation(), Representation::EdgeTable);
        status.resources_with_ancestry = 1;
        assert_eq!(status.representation(), Representation::Mixed);
        status.governed_edges = 0;
        assert_eq!(status.representation(), Representation::Flattened);
    }

    #[test]
    fn test_report_json_shape() {
        let report = TranscodeReport::Forward(ForwardReport {
            governed_edges: 2,
            resources_updated: 2,
            edges_deleted: 2,
            diagnostics: vec![],
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Forward"]["edges_deleted"], 2);
        let back: TranscodeReport = serde_json::from_value(json).unwrap();
        assert_eq!(back.direction(), Direction::Up);
    }

    #[test]
    fn test_transcoder_rejects_blank_config() {
        let err = Transcoder::new(TranscodeConfig::new("", "VmOrTemplate")).unwrap_err();
        assert!(matches!(err, TranscodeError::Config(_)));
    }
}
