//! # ancestry-transcoder
//!
//! Lossless conversion of a resource hierarchy between two storage representations.
//!
//! ## Overview
//!
//! A genealogy forest (virtual machines and the templates they were cloned from, for example)
//! can be stored two ways:
//!
//! - **Edge-table form**: one relationship row per resource, each carrying a materialized path
//!   of *relationship row ids* (`relationships.ancestry = "12/7"`).
//! - **Flattened form**: each resource carries its own materialized path of *resource ids*
//!   (`resources.ancestry = "42/17"`).
//!
//! Both paths are `/`-joined, nearest ancestor first, root last. `NULL` (or `""`) means root.
//!
//! The [`transcode::ForwardTranscoder`] ("up") flattens governed relationship rows onto their
//! resources and deletes those rows. The [`transcode::ReverseTranscoder`] ("down") rebuilds one
//! relationship row per resource in ancestor-before-descendant order, threading each new row's
//! path through the ids of rows created earlier in the same run.
//!
//! Only rows of one relationship kind and subject type are governed (by default
//! `("genealogy", "VmOrTemplate")`). Every other row is opaque: never parsed, never written.
//!
//! ## Architecture
//!
//! - **[`ancestry`]**: materialized path codec, generic over the id space
//! - **[`forest`]**: governed edge loading and the reverse-direction dependency forest
//! - **[`resolver`]**: path translation between edge ids and resource ids
//! - **[`transcode`]**: the two passes, reports and the [`transcode::Transcoder`] façade
//! - **[`store`]**: the narrow store contracts; [`memory`] and `db` implement them
//!
//! ## Quick Start
//!
//! ```rust
//! use ancestry_transcoder::{
//!     memory::{MemoryEdgeStore, MemoryResourceStore},
//!     properties::{GENEALOGY, VM_OR_TEMPLATE},
//!     transcode::{Direction, Transcoder},
//!     TranscodeConfig,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut resources = MemoryResourceStore::new();
//! let mut edges = MemoryEdgeStore::new();
//! let template = resources.insert(VM_OR_TEMPLATE, None);
//! let clone = resources.insert(VM_OR_TEMPLATE, None);
//! let template_rel = edges.insert(GENEALOGY, VM_OR_TEMPLATE, template, None);
//! let template_path = template_rel.to_string();
//! edges.insert(GENEALOGY, VM_OR_TEMPLATE, clone, Some(template_path.as_str()));
//!
//! let transcoder = Transcoder::new(TranscodeConfig::default())?;
//! transcoder.run(Direction::Up, &mut resources, &mut edges).await?;
//!
//! assert_eq!(resources.ancestry_of(clone), Some(template.to_string().as_str()));
//! assert!(edges.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **default**: core library with in-memory stores
//! - **service**: SQLite stores over a single sqlx transaction (`db`)
//! - **bin**: the `ancestry` command line driver

pub mod ancestry;
pub mod config;
#[cfg(feature = "service")]
pub mod db;
pub mod diagnostic;
pub mod error;
pub mod forest;
pub mod memory;
pub mod properties;
pub mod resolver;
pub mod store;
#[cfg(test)]
mod tests;
pub mod transcode;

pub use config::TranscodeConfig;
pub use error::*;
