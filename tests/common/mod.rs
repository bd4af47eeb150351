//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use ancestry_transcoder::{
    memory::{MemoryEdgeStore, MemoryResourceStore},
    properties::{EdgeId, ResourceId, GENEALOGY, VM_OR_TEMPLATE},
};
use std::collections::BTreeMap;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A pair of in-memory stores with resources and relationship rows addressed by name.
///
/// `rel("child", kind, &["parent", "grandparent"])` writes the row for `child` whose path is
/// the ids of the rows previously written for `parent` and `grandparent`, nearest first.
#[allow(dead_code)]
#[derive(Default)]
pub struct Genealogy {
    pub resources: MemoryResourceStore,
    pub edges: MemoryEdgeStore,
    vms: BTreeMap<&'static str, ResourceId>,
    rels: BTreeMap<&'static str, EdgeId>,
}

#[allow(dead_code)]
impl Genealogy {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    pub fn vm(&mut self, name: &'static str) -> ResourceId {
        self.resource(name, VM_OR_TEMPLATE, None)
    }

    /// A resource whose flattened ancestry names earlier resources, nearest first.
    pub fn vm_under(&mut self, name: &'static str, ancestors: &[&str]) -> ResourceId {
        let ancestry = self.ancestry_for(ancestors);
        self.resource(name, VM_OR_TEMPLATE, ancestry.as_deref())
    }

    pub fn resource(
        &mut self,
        name: &'static str,
        resource_type: &str,
        ancestry: Option<&str>,
    ) -> ResourceId {
        let id = self.resources.insert(resource_type, ancestry);
        self.vms.insert(name, id);
        id
    }

    pub fn rel(&mut self, name: &'static str, kind: &str, ancestors: &[&str]) -> EdgeId {
        let path = join(ancestors.iter().map(|n| self.rel_id(n).to_string()));
        let subject = self.id(name);
        let id = self
            .edges
            .insert(kind, VM_OR_TEMPLATE, subject, path.as_deref());
        self.rels.insert(name, id);
        id
    }

    pub fn genealogy(&mut self, name: &'static str, ancestors: &[&str]) -> EdgeId {
        self.rel(name, GENEALOGY, ancestors)
    }

    pub fn id(&self, name: &str) -> ResourceId {
        self.vms[name]
    }

    pub fn rel_id(&self, name: &str) -> EdgeId {
        self.rels[name]
    }

    /// The flattened ancestry expected for a resource whose ancestors are `names`.
    pub fn ancestry_for(&self, names: &[&str]) -> Option<String> {
        join(names.iter().map(|n| self.id(n).to_string()))
    }

    pub fn ancestry_of(&self, name: &str) -> Option<String> {
        self.resources.ancestry_of(self.id(name)).map(str::to_string)
    }

    /// The governed row whose subject is `name`, if exactly one exists.
    pub fn edge_of(&self, name: &str) -> Option<EdgeId> {
        let subject = self.id(name);
        let mut found = self
            .edges
            .iter()
            .filter(|e| e.kind == GENEALOGY && e.subject.subject_id == subject);
        let first = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(first.id),
        }
    }

    /// The path of the governed row whose subject is `name`, rendered as subject names.
    ///
    /// Lets tests compare edge-table shapes without depending on the ids the store assigned.
    pub fn edge_path_names(&self, name: &str) -> Option<Vec<&'static str>> {
        let edge = self.edges.get(self.edge_of(name)?)?;
        let path = edge.ancestry.as_deref()?;
        path.split('/')
            .map(|segment| {
                let id: EdgeId = segment.parse().ok()?;
                let subject = self.edges.get(id)?.subject.subject_id;
                self.name_of(subject)
            })
            .collect()
    }

    pub fn name_of(&self, id: ResourceId) -> Option<&'static str> {
        self.vms
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(name, _)| *name)
    }
}

fn join<I: Iterator<Item = String>>(ids: I) -> Option<String> {
    let joined = ids.collect::<Vec<String>>().join("/");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
