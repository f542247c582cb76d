//! Expands a delimited multi-value column into join-table rows.
//!
//! Each source row gets an owner ID equal to its 1-based position in the
//! file, which is the ID the owning export table assigned on import. Every
//! name in the cell becomes one `(owner_id, reference_id)` row, in order.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::countries::NameNormalizer;
use crate::error::DbResult;
use crate::frame::Frame;
use crate::importer::{bulk_insert, ImportReport, Unresolved};
use crate::pool::DbPool;
use crate::resolver::IdResolver;
use crate::schema::TableSchema;
use crate::source::read_table;
use crate::value::Value;

/// How one multi-value column becomes a join table.
#[derive(Debug)]
pub struct SplitPlan {
    /// Destination join table: `(id, owner_id, reference_id)`.
    pub table: &'static TableSchema,
    /// Export file stem.
    pub source: &'static str,
    /// Header of the multi-value column.
    pub column: &'static str,
    pub delimiter: &'static str,
    pub reference: &'static TableSchema,
    pub key: &'static str,
}

/// Join rows plus the names that did not resolve.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub rows: Vec<Vec<Value>>,
    pub miss_count: usize,
    pub missing: BTreeSet<String>,
}

pub struct MultiValueSplitter<'a> {
    pool: &'a DbPool,
    normalizer: Option<&'a dyn NameNormalizer>,
}

impl<'a> MultiValueSplitter<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool, normalizer: None }
    }

    pub fn with_normalizer(mut self, normalizer: &'a dyn NameNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Split `frame[plan.column]` into join rows.
    pub fn split(&self, plan: &SplitPlan, frame: &Frame) -> DbResult<Split> {
        let resolver = IdResolver::load(self.pool, plan.reference, plan.key)?;
        let cells = frame.column(plan.column)?;

        let mut split = Split::default();
        for (index, cell) in cells.into_iter().enumerate() {
            let owner = Value::Integer(index as i64 + 1);
            let Some(text) = cell.as_key() else {
                continue;
            };

            for name in text.split(plan.delimiter).map(str::trim).filter(|n| !n.is_empty()) {
                let key = match self.normalizer {
                    Some(normalizer) => normalizer.normalize(name),
                    None => Some(name.to_string()),
                };
                let id = key.as_deref().and_then(|k| resolver.resolve(k));
                if id.is_none() {
                    split.miss_count += 1;
                    split.missing.insert(name.to_string());
                }
                split.rows.push(vec![owner.clone(), Value::from(id)]);
            }
        }

        if split.miss_count > 0 {
            warn!(
                table = plan.table.name,
                misses = split.miss_count,
                missing = ?split.missing,
                "Unresolved names stored as NULL"
            );
        }
        Ok(split)
    }

    /// Read the export, split it, and insert the join rows atomically.
    pub fn import_file(&self, plan: &SplitPlan, path: &Path) -> DbResult<ImportReport> {
        info!(table = plan.table.name, path = %path.display(), column = plan.column, "Splitting");
        let frame = read_table(path)?;
        let split = self.split(plan, &frame)?;

        let columns: Vec<&'static str> = plan.table.data_columns().iter().map(|c| c.name).collect();
        let rows_inserted = bulk_insert(self.pool, plan.table, &columns, &split.rows)?;

        info!(table = plan.table.name, rows = rows_inserted, "Imported");
        let unresolved = if split.miss_count > 0 {
            vec![Unresolved {
                column: columns.last().copied().unwrap_or(plan.column),
                count: split.miss_count,
                missing: split.missing.into_iter().collect(),
            }]
        } else {
            Vec::new()
        };

        Ok(ImportReport {
            table: plan.table.name,
            rows_inserted,
            unresolved,
        })
    }
}
