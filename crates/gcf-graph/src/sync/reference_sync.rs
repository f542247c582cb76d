//! Reference table → plain nodes.

use anyhow::Result;
use tracing::debug;

use gcf_db::DbPool;

use super::{read_records, SyncResult};
use crate::catalog::NodeSync;
use crate::executor::BatchWriter;
use crate::store::Statement;

/// Merge one node per row of `sync.table`, every column a property.
pub async fn sync_reference(writer: &BatchWriter<'_>, db: &DbPool, sync: &NodeSync) -> Result<SyncResult> {
    let records = read_records(db, sync.table)?;
    debug!(label = %sync.label, table = sync.table.name, rows = records.len(), "Read reference rows");

    let nodes_written = writer.run(&Statement::MergeNodes(sync.label), &records).await?;
    Ok(SyncResult {
        nodes_written,
        relationships_written: 0,
    })
}
