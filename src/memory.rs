//! In-memory stores.
//!
//! Both stores keep rows in a `BTreeMap` keyed by id and hand out ids from a monotonically
//! increasing counter, mirroring an auto-increment primary key. They back the test suite and
//! the benchmarks, and are a convenient staging area for callers that snapshot their data.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    ancestry::normalize,
    error::TranscodeError,
    properties::{Edge, EdgeId, NewEdge, Resource, ResourceId, Subject},
    store::{EdgeStore, ResourceStore},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryResourceStore {
    rows: BTreeMap<ResourceId, Resource>,
    next_id: i64,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource with the next free id.
    pub fn insert(&mut self, resource_type: &str, ancestry: Option<&str>) -> ResourceId {
        self.next_id += 1;
        let id = ResourceId(self.next_id);
        self.rows.insert(
            id,
            Resource::new(id, resource_type, ancestry.map(str::to_string)),
        );
        id
    }

    /// Insert or replace a resource with a caller-chosen id.
    pub fn insert_with_id(&mut self, resource: Resource) {
        self.next_id = self.next_id.max(resource.id.get());
        let resource = Resource::new(resource.id, resource.resource_type, resource.ancestry);
        self.rows.insert(resource.id, resource);
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.rows.get(&id)
    }

    pub fn ancestry_of(&self, id: ResourceId) -> Option<&str> {
        self.rows.get(&id).and_then(|r| r.ancestry.as_deref())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.rows.values()
    }
}

impl ResourceStore for MemoryResourceStore {
    async fn find_resources(&self, resource_type: &str) -> Result<Vec<Resource>, TranscodeError> {
        Ok(self
            .rows
            .values()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect())
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Resource, TranscodeError> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or_else(|| TranscodeError::NotFound(id.label()))
    }

    async fn set_ancestry(
        &mut self,
        id: ResourceId,
        ancestry: Option<String>,
    ) -> Result<(), TranscodeError> {
        let resource = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| TranscodeError::NotFound(id.label()))?;
        resource.ancestry = normalize(ancestry);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEdgeStore {
    rows: BTreeMap<EdgeId, Edge>,
    next_id: i64,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row with the next free id. Used to seed fixtures without going through the
    /// async trait.
    pub fn insert(
        &mut self,
        kind: &str,
        subject_type: &str,
        subject_id: ResourceId,
        ancestry: Option<&str>,
    ) -> EdgeId {
        let edge = NewEdge::new(
            kind,
            Subject::new(subject_type, subject_id),
            ancestry.map(str::to_string),
        );
        self.push(edge).id
    }

    fn push(&mut self, edge: NewEdge) -> Edge {
        self.next_id += 1;
        let edge = edge.into_edge(EdgeId(self.next_id));
        self.rows.insert(edge.id, edge.clone());
        edge
    }

    pub fn get(&self, id: EdgeId) -> Option<&Edge> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.rows.values()
    }
}

impl EdgeStore for MemoryEdgeStore {
    async fn find_edges(
        &self,
        kind: &str,
        subject_type: &str,
    ) -> Result<Vec<Edge>, TranscodeError> {
        Ok(self
            .rows
            .values()
            .filter(|e| e.is_governed(kind, subject_type))
            .cloned()
            .collect())
    }

    async fn create_edge(&mut self, edge: NewEdge) -> Result<Edge, TranscodeError> {
        let edge = NewEdge::new(edge.kind, edge.subject, edge.ancestry);
        Ok(self.push(edge))
    }

    async fn delete_edges(&mut self, ids: &BTreeSet<EdgeId>) -> Result<(), TranscodeError> {
        self.rows.retain(|id, _| !ids.contains(id));
        Ok(())
    }

    async fn count_edges(&self) -> Result<usize, TranscodeError> {
        Ok(self.rows.len())
    }
}
