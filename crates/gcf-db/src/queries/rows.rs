//! Typed whole-table reads.

use crate::error::DbResult;
use crate::pool::DbPool;
use crate::schema::TableSchema;
use crate::value::Value;

/// Every row of `table` (or view), columns in declaration order, ordered by `id`.
pub fn fetch_rows(pool: &DbPool, table: &TableSchema) -> DbResult<Vec<Vec<Value>>> {
    pool.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            table.column_names().join(", "),
            table.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            table
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| -> rusqlite::Result<Value> {
                    Ok(Value::from_sql(row.get_ref(i)?, column.kind))
                })
                .collect::<rusqlite::Result<Vec<Value>>>()
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    })
}

pub fn count_rows(pool: &DbPool, table: &TableSchema) -> DbResult<i64> {
    pool.with_conn(|conn| {
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| row.get(0))?;
        Ok(count)
    })
}

/// Row counts for each of `tables`, in order.
pub fn table_counts(pool: &DbPool, tables: &[&'static TableSchema]) -> DbResult<Vec<(&'static str, i64)>> {
    tables
        .iter()
        .map(|table| Ok((table.name, count_rows(pool, table)?)))
        .collect()
}
