//! Name → surrogate ID mappings built from reference tables.
//!
//! A resolver never guesses: keys that are not present resolve to `None`.
//! Correcting known naming mismatches is the caller's job (see
//! [`crate::countries`]).

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::DbPool;
use crate::schema::{ColumnKind, TableSchema};
use crate::value::Value;

/// Exact-match lookup from a key column to `id`.
#[derive(Debug, Clone)]
pub struct IdResolver {
    ids: HashMap<String, i64>,
}

/// Result of resolving a whole column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// One entry per input cell: the ID, or NULL when unresolved.
    pub values: Vec<Value>,
    /// Distinct non-null keys that had no match.
    pub missing: BTreeSet<String>,
    /// Number of non-null cells that failed to resolve.
    pub miss_count: usize,
}

impl IdResolver {
    /// Load the mapping for `table` keyed on `key` (usually `name`).
    ///
    /// Rows whose key is NULL are skipped.
    pub fn load(pool: &DbPool, table: &'static TableSchema, key: &str) -> DbResult<Self> {
        if table.column(key).is_none() {
            return Err(DbError::MissingColumn {
                column: key.to_string(),
                available: table.column_names().iter().map(|c| c.to_string()).collect(),
            });
        }

        let ids = pool.with_conn(|conn| {
            let sql = format!("SELECT {}, id FROM {} WHERE {} IS NOT NULL", key, table.name, key);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                let name = Value::from_sql(row.get_ref(0)?, ColumnKind::Text);
                let id: i64 = row.get(1)?;
                Ok((name, id))
            })?;

            let mut ids = HashMap::new();
            for row in rows {
                let (name, id) = row?;
                if let Some(name) = name.as_key() {
                    ids.insert(name, id);
                }
            }
            Ok(ids)
        })?;

        debug!(table = table.name, key, entries = ids.len(), "Loaded ID mapping");
        Ok(Self { ids })
    }

    /// Build a resolver from explicit pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            ids: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn resolve(&self, key: &str) -> Option<i64> {
        self.ids.get(key).copied()
    }

    /// Resolve every cell of a column, collecting misses for auditing.
    pub fn resolve_all<'a, I>(&self, cells: I) -> Resolution
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut resolution = Resolution::default();
        for cell in cells {
            match cell.as_key() {
                None => resolution.values.push(Value::Null),
                Some(key) => match self.resolve(&key) {
                    Some(id) => resolution.values.push(Value::Integer(id)),
                    None => {
                        resolution.values.push(Value::Null);
                        resolution.miss_count += 1;
                        resolution.missing.insert(key);
                    }
                },
            }
        }
        resolution
    }
}
