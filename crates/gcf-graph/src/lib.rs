//! # GCF Graph
//!
//! Neo4j knowledge graph synchronization for GCF data.
//!
//! Mirrors the SQLite store into labelled nodes and typed relationships
//! through batched, idempotent MERGE writes.

pub mod catalog;
pub mod client;
pub mod executor;
pub mod label;
pub mod memory;
pub mod schema;
pub mod store;
pub mod sync;

pub use catalog::{validate_catalog, EntitySync, NodeSync, ENTITY_SYNCS, REFERENCE_SYNCS};
pub use client::{GraphClient, GraphConfig};
pub use executor::{BatchWriter, DEFAULT_CHUNK_SIZE};
pub use label::{Direction, Label, Relation};
pub use memory::MemoryGraph;
pub use store::{GraphCounts, GraphStore, Record, Statement};
pub use sync::{run_full_sync, SyncResult};
