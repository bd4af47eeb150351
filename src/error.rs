use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "service")]
use sqlx::{migrate::MigrateError, Error as SqlxError};

use serde_json::Error as JsonError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TranscodeError {
    /// A materialized path names an identifier with no governed counterpart. In the forward
    /// direction this is an edge id outside the governed set; in the reverse direction it is
    /// an ancestor that never received an edge (a cycle, or a rejected missing ancestor).
    #[error("Dangling ancestry reference: {record} names {missing}, which has no governed counterpart")]
    DanglingReference { record: String, missing: String },
    #[error("Malformed ancestry '{value}': {reason}")]
    MalformedAncestry { value: String, reason: String },
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Store write failed: {0}")]
    StoreWrite(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File System error: {0}")]
    Io(String),
}

impl TranscodeError {
    pub fn dangling(record: impl ToString, missing: impl ToString) -> Self {
        TranscodeError::DanglingReference {
            record: record.to_string(),
            missing: missing.to_string(),
        }
    }

    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        TranscodeError::MalformedAncestry {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that indicate bad data rather than a failing store.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            TranscodeError::DanglingReference { .. } | TranscodeError::MalformedAncestry { .. }
        )
    }
}

impl From<toml::de::Error> for TranscodeError {
    fn from(src: toml::de::Error) -> TranscodeError {
        TranscodeError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for TranscodeError {
    fn from(src: toml::ser::Error) -> TranscodeError {
        TranscodeError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for TranscodeError {
    fn from(src: JsonError) -> TranscodeError {
        TranscodeError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for TranscodeError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => TranscodeError::NotFound(format!("{x}")),
            _ => TranscodeError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

#[cfg(feature = "service")]
impl From<SqlxError> for TranscodeError {
    fn from(src: SqlxError) -> TranscodeError {
        match src {
            SqlxError::RowNotFound => TranscodeError::NotFound("database row".to_string()),
            SqlxError::ColumnDecode { index, source } => TranscodeError::Serialization(format!(
                "Could not decode column {index}: {source}"
            )),
            SqlxError::Decode(source) => {
                TranscodeError::Serialization(format!("Could not decode row: {source}"))
            }
            SqlxError::Database(db_err) => {
                TranscodeError::StoreWrite(format!("Database error: {}", db_err.message()))
            }
            SqlxError::Io(e) => TranscodeError::Io(format!("Database IO error: {e}")),
            other => TranscodeError::StoreWrite(format!("{other}")),
        }
    }
}

#[cfg(feature = "service")]
impl From<MigrateError> for TranscodeError {
    fn from(src: MigrateError) -> TranscodeError {
        TranscodeError::StoreWrite(format!("Schema migration failed: {src}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_fault_classification() {
        assert!(TranscodeError::dangling("edge 4", "edge 9").is_integrity_fault());
        assert!(TranscodeError::malformed("1//2", "empty segment").is_integrity_fault());
        assert!(!TranscodeError::StoreWrite("constraint".into()).is_integrity_fault());
    }

    #[test]
    fn test_dangling_reference_message_names_both_sides() {
        let err = TranscodeError::dangling("edge 12", "edge 7");
        let msg = err.to_string();
        assert!(msg.contains("edge 12"), "{msg}");
        assert!(msg.contains("edge 7"), "{msg}");
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: TranscodeError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, TranscodeError::NotFound(_)));
    }
}
