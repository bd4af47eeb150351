//! Shared test utilities for transcoder testing

use crate::{
    memory::{MemoryEdgeStore, MemoryResourceStore},
    properties::{EdgeId, ResourceId, GENEALOGY, VM_OR_TEMPLATE},
};
use std::collections::BTreeMap;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Named resources and relationship rows over a pair of in-memory stores.
#[derive(Default)]
pub struct Fixture {
    pub resources: MemoryResourceStore,
    pub edges: MemoryEdgeStore,
    vms: BTreeMap<&'static str, ResourceId>,
    rels: BTreeMap<&'static str, EdgeId>,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    pub fn vm(&mut self, name: &'static str) -> ResourceId {
        let id = self.resources.insert(VM_OR_TEMPLATE, None);
        self.vms.insert(name, id);
        id
    }

    /// Relationship row for the vm `name`, whose path names earlier rows (by vm name) nearest
    /// first.
    pub fn rel(&mut self, name: &'static str, kind: &str, ancestors: &[&'static str]) -> EdgeId {
        let path = self.rel_path(ancestors);
        let subject = self.id(name);
        let id = self
            .edges
            .insert(kind, VM_OR_TEMPLATE, subject, path.as_deref());
        self.rels.insert(name, id);
        id
    }

    pub fn genealogy(&mut self, name: &'static str, ancestors: &[&'static str]) -> EdgeId {
        self.rel(name, GENEALOGY, ancestors)
    }

    pub fn id(&self, name: &str) -> ResourceId {
        self.vms[name]
    }

    pub fn rel_id(&self, name: &str) -> EdgeId {
        self.rels[name]
    }

    fn rel_path(&self, names: &[&str]) -> Option<String> {
        join(names.iter().map(|n| self.rel_id(n).to_string()))
    }

    /// The flattened ancestry expected for a resource whose ancestors are `names`.
    pub fn ancestry_for(&self, names: &[&str]) -> Option<String> {
        join(names.iter().map(|n| self.id(n).to_string()))
    }

    pub fn ancestry_of(&self, name: &str) -> Option<String> {
        self.resources.ancestry_of(self.id(name)).map(str::to_string)
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
