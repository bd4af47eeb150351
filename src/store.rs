//! Store contracts consumed by the transcoders.
//!
//! The transcoders only ever list, update one column, insert and bulk delete. Implementations are expected to normalize empty ancestry strings
//! to `None` on both read and write (see [`crate::ancestry::normalize`]).
//!
//! The in-memory implementations live in [`crate::memory`]; the SQLite implementations live in
//! `crate::db` behind the `service` feature.

use std::collections::BTreeSet;
use std::future::Future;

use crate::{
    error::TranscodeError,
    properties::{Edge, EdgeId, NewEdge, Resource, ResourceId},
};

pub trait ResourceStore: Send + Sync {
    /// All resources of `resource_type`, ascending by id.
    fn find_resources(
        &self,
        resource_type: &str,
    ) -> impl Future<Output = Result<Vec<Resource>, TranscodeError>> + Send;

    /// Fails with [`TranscodeError::NotFound`] when no such resource exists.
    fn get_resource(
        &self,
        id: ResourceId,
    ) -> impl Future<Output = Result<Resource, TranscodeError>> + Send;

    /// Overwrite the flattened ancestry column. Fails with [`TranscodeError::NotFound`] when no
    /// such resource exists.
    fn set_ancestry(
        &mut self,
        id: ResourceId,
        ancestry: Option<String>,
    ) -> impl Future<Output = Result<(), TranscodeError>> + Send;
}

pub trait EdgeStore: Send + Sync {
    /// All edges with exactly this `(kind, subject_type)` pair, ascending by id.
    fn find_edges(
        &self,
        kind: &str,
        subject_type: &str,
    ) -> impl Future<Output = Result<Vec<Edge>, TranscodeError>> + Send;

    /// Insert a row and return it with its store-assigned id.
    fn create_edge(
        &mut self,
        edge: NewEdge,
    ) -> impl Future<Output = Result<Edge, TranscodeError>> + Send;

    /// Remove every listed row. Ids that do not exist are ignored.
    fn delete_edges(
        &mut self,
        ids: &BTreeSet<EdgeId>,
    ) -> impl Future<Output = Result<(), TranscodeError>> + Send;

    /// Number of rows of any kind.
    fn count_edges(&self) -> impl Future<Output = Result<usize, TranscodeError>> + Send;
}
