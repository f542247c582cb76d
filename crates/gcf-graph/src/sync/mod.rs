//! SQLite to Neo4j synchronization pipeline.
//!
//! Reference tables are synchronized first so that every entity edge has
//! its target node in place, then entity tables in catalog order.

pub mod entity_sync;
pub mod reference_sync;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use gcf_db::schema::TableSchema;
use gcf_db::{DbPool, Value};

use crate::catalog::{validate_catalog, ENTITY_SYNCS, REFERENCE_SYNCS};
use crate::executor::BatchWriter;
use crate::schema::initialize_schema;
use crate::store::Record;

/// Result of a sync operation.
///
/// Counts are records submitted; MERGE leaves existing nodes and edges as
/// they are, and edges whose endpoints are missing are not created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub nodes_written: usize,
    pub relationships_written: usize,
}

impl SyncResult {
    pub fn merge(&mut self, other: &SyncResult) {
        self.nodes_written += other.nodes_written;
        self.relationships_written += other.relationships_written;
    }
}

/// `entity_type_id` → `entityTypeId`.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Read `table` as records keyed by camelCase column names.
pub(crate) fn read_records(db: &DbPool, table: &TableSchema) -> Result<Vec<Record>> {
    let rows = gcf_db::queries::fetch_rows(db, table)
        .with_context(|| format!("Failed to read {}", table.name))?;

    let names: Vec<String> = table.columns.iter().map(|c| snake_to_camel(c.name)).collect();
    Ok(rows
        .into_iter()
        .map(|row| names.iter().cloned().zip(row).collect())
        .collect())
}

/// Integer ID held in `record[field]`, if any.
pub(crate) fn id_of(record: &Record, field: &str) -> Option<i64> {
    record.get(field).and_then(Value::as_i64)
}

/// Run the full sync: validate the catalog, create constraints, then write
/// reference nodes and entity nodes and edges.
pub async fn run_full_sync(writer: &BatchWriter<'_>, db: &DbPool) -> Result<SyncResult> {
    info!(chunk_size = writer.chunk_size(), "Starting full graph sync");

    validate_catalog(REFERENCE_SYNCS, ENTITY_SYNCS)?;
    initialize_schema(writer.store()).await?;

    let mut total = SyncResult::default();

    for sync in REFERENCE_SYNCS {
        let result = reference_sync::sync_reference(writer, db, sync)
            .await
            .with_context(|| format!("Failed to sync {} nodes", sync.label))?;
        info!(label = %sync.label, nodes = result.nodes_written, "Reference nodes synced");
        total.merge(&result);
    }

    for sync in ENTITY_SYNCS {
        let result = entity_sync::sync_entity(writer, db, sync)
            .await
            .with_context(|| format!("Failed to sync {} entities", sync.label))?;
        info!(
            label = %sync.label,
            nodes = result.nodes_written,
            rels = result.relationships_written,
            "Entities synced"
        );
        total.merge(&result);
    }

    info!(
        nodes = total.nodes_written,
        relationships = total.relationships_written,
        "Full sync complete"
    );

    Ok(total)
}
