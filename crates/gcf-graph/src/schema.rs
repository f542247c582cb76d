//! Neo4j schema initialization.

use anyhow::Result;
use tracing::info;

use crate::label::Label;
use crate::store::GraphStore;

/// Create an `id` uniqueness constraint for every label.
///
/// Safe to run multiple times.
pub async fn initialize_schema(store: &dyn GraphStore) -> Result<usize> {
    info!("Initializing Neo4j schema...");

    for label in Label::ALL {
        store.ensure_unique_id(label).await?;
    }

    info!("Neo4j schema initialized ({} constraints)", Label::ALL.len());
    Ok(Label::ALL.len())
}
