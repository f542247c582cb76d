//! GCF relational layer.
//!
//! SQLite schema and migrations, source-file readers, the tabular importer
//! and multi-value splitter, and the ID resolver they share.

pub mod countries;
pub mod error;
pub mod frame;
pub mod importer;
pub mod migrations;
pub mod plans;
pub mod pool;
pub mod queries;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod splitter;
pub mod value;

pub use countries::{default_overrides, CountryNormalizer, NameNormalizer};
pub use error::{DbError, DbResult};
pub use frame::Frame;
pub use importer::{ImportPlan, ImportReport, NullPolicy, TabularImporter};
pub use migrations::run_migrations;
pub use pool::DbPool;
pub use resolver::IdResolver;
pub use schema::{ColumnKind, TableSchema};
pub use splitter::{MultiValueSplitter, SplitPlan};
pub use value::Value;

use std::path::Path;

/// Open the database at `path` and bring its schema up to date.
pub fn init_pool(path: &Path) -> DbResult<DbPool> {
    let pool = DbPool::open(path)?;
    run_migrations(&pool)?;
    Ok(pool)
}
