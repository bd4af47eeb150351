//! Record types shared by both stores.
//!
//! Resources and edges live in separate identifier spaces. [`ResourceId`] and [`EdgeId`] are
//! distinct newtypes so that a resource-id path can never be written where an edge-id path is
//! expected (or vice versa).

use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};

#[cfg(feature = "service")]
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use crate::ancestry::normalize;

/// Relationship kind governed by default.
pub const GENEALOGY: &str = "genealogy";

/// Resource type governed by default.
pub const VM_OR_TEMPLATE: &str = "VmOrTemplate";

macro_rules! id_type {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }

            /// Human readable label used in diagnostics and error messages.
            pub fn label(self) -> String {
                format!("{} {}", $label, self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map($name)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(ResourceId, "resource");
id_type!(EdgeId, "edge");

/// Polymorphic reference from an edge to the resource it describes.
///
/// Only one `subject_type` is ever governed, but the pair is kept verbatim for every row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub subject_type: String,
    pub subject_id: ResourceId,
}

impl Subject {
    pub fn new(subject_type: impl Into<String>, subject_id: ResourceId) -> Self {
        Subject {
            subject_type: subject_type.into(),
            subject_id,
        }
    }

    pub fn is(&self, subject_type: &str) -> bool {
        self.subject_type == subject_type
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.subject_type, self.subject_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub resource_type: String,
    /// Flattened ancestry, `/`-joined resource ids, nearest first.
    pub ancestry: Option<String>,
}

impl Resource {
    pub fn new(id: ResourceId, resource_type: impl Into<String>, ancestry: Option<String>) -> Self {
        Resource {
            id,
            resource_type: resource_type.into(),
            ancestry: normalize(ancestry),
        }
    }
}

/// A relationship row.
///
/// `ancestry` is the raw `/`-joined edge-id path. It is only decoded for governed rows, so
/// other rows round-trip through a store byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub kind: String,
    pub subject: Subject,
    pub ancestry: Option<String>,
}

impl Edge {
    pub fn is_governed(&self, kind: &str, subject_type: &str) -> bool {
        self.kind == kind && self.subject.is(subject_type)
    }
}

/// Insert payload for [`crate::store::EdgeStore::create_edge`]; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEdge {
    pub kind: String,
    pub subject: Subject,
    pub ancestry: Option<String>,
}

impl NewEdge {
    pub fn new(kind: impl Into<String>, subject: Subject, ancestry: Option<String>) -> Self {
        NewEdge {
            kind: kind.into(),
            subject,
            ancestry: normalize(ancestry),
        }
    }

    pub fn into_edge(self, id: EdgeId) -> Edge {
        Edge {
            id,
            kind: self.kind,
            subject: self.subject,
            ancestry: self.ancestry,
        }
    }
}

#[cfg(feature = "service")]
impl FromRow<'_, SqliteRow> for Resource {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let id: i64 = row.try_get("id")?;
        let resource_type: String = row.try_get("resource_type")?;
        let ancestry: Option<String> = row.try_get("ancestry")?;
        Ok(Resource::new(ResourceId(id), resource_type, ancestry))
    }
}

#[cfg(feature = "service")]
impl FromRow<'_, SqliteRow> for Edge {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let id: i64 = row.try_get("id")?;
        let kind: String = row.try_get("relationship")?;
        let subject_type: String = row.try_get("resource_type")?;
        let subject_id: i64 = row.try_get("resource_id")?;
        let ancestry: Option<String> = row.try_get("ancestry")?;
        Ok(Edge {
            id: EdgeId(id),
            kind,
            subject: Subject::new(subject_type, ResourceId(subject_id)),
            ancestry: normalize(ancestry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_and_display() {
        let id: ResourceId = "645".parse().unwrap();
        assert_eq!(id, ResourceId(645));
        assert_eq!(id.to_string(), "645");
        assert!("x".parse::<EdgeId>().is_err());
        assert_eq!(EdgeId(3).label(), "edge 3");
    }

    #[test]
    fn test_governed_requires_kind_and_subject_type() {
        let edge = Edge {
            id: EdgeId(1),
            kind: GENEALOGY.to_string(),
            subject: Subject::new(VM_OR_TEMPLATE, ResourceId(1)),
            ancestry: None,
        };
        assert!(edge.is_governed(GENEALOGY, VM_OR_TEMPLATE));
        assert!(!edge.is_governed("ems_metadata", VM_OR_TEMPLATE));
        assert!(!edge.is_governed(GENEALOGY, "Host"));
    }

    #[test]
    fn test_new_edge_normalizes_empty_ancestry() {
        let edge = NewEdge::new(
            GENEALOGY,
            Subject::new(VM_OR_TEMPLATE, ResourceId(2)),
            Some(String::new()),
        );
        assert_eq!(edge.ancestry, None);
        let resource = Resource::new(ResourceId(2), VM_OR_TEMPLATE, Some(String::new()));
        assert_eq!(resource.ancestry, None);
    }
}
