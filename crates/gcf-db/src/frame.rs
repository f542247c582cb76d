//! In-memory table of named columns, the unit every importer reshapes.

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// Rows of cells under an ordered header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame, padding or truncating rows to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact header name.
    pub fn index_of(&self, name: &str) -> DbResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DbError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> DbResult<Vec<&Value>> {
        let idx = self.index_of(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Drop the last `n` columns (computed columns at the end of an export).
    pub fn drop_trailing(&mut self, n: usize) {
        let keep = self.columns.len().saturating_sub(n);
        self.columns.truncate(keep);
        for row in &mut self.rows {
            row.truncate(keep);
        }
    }

    pub fn drop_column(&mut self, name: &str) -> DbResult<()> {
        let idx = self.index_of(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    /// Rewrite every cell of a column in place.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> DbResult<()>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.index_of(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Replace a column's header and values at its current position.
    pub fn replace_column(&mut self, name: &str, new_name: &str, values: Vec<Value>) -> DbResult<()> {
        let idx = self.index_of(name)?;
        if values.len() != self.rows.len() {
            return Err(DbError::SchemaMismatch {
                table: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns[idx] = new_name.to_string();
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Move a column so that it ends up at `index` (clamped to the width).
    pub fn move_column(&mut self, name: &str, index: usize) -> DbResult<()> {
        let from = self.index_of(name)?;
        let to = index.min(self.columns.len() - 1);
        let header = self.columns.remove(from);
        self.columns.insert(to, header);
        for row in &mut self.rows {
            let cell = row.remove(from);
            row.insert(to, cell);
        }
        Ok(())
    }

    /// Positional rename: header `i` becomes `names[i]`.
    pub fn rename_all(&mut self, table: &str, names: &[&str]) -> DbResult<()> {
        if names.len() != self.columns.len() {
            return Err(DbError::SchemaMismatch {
                table: table.to_string(),
                expected: names.len(),
                found: self.columns.len(),
            });
        }
        self.columns = names.iter().map(|n| n.to_string()).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                vec![Value::Integer(1), Value::from("x"), Value::from(true)],
                vec![Value::Integer(2), Value::from("y")],
            ],
        )
    }

    #[test]
    fn test_short_rows_are_padded() {
        let frame = sample();
        assert_eq!(frame.rows()[1][2], Value::Null);
    }

    #[test]
    fn test_move_column_to_front() {
        let mut frame = sample();
        frame.move_column("C", 0).unwrap();
        assert_eq!(frame.columns(), &["C", "A", "B"]);
        assert_eq!(frame.rows()[0][0], Value::Boolean(true));
    }

    #[test]
    fn test_drop_trailing_and_named() {
        let mut frame = sample();
        frame.drop_trailing(1);
        frame.drop_column("A").unwrap();
        assert_eq!(frame.columns(), &["B"]);
        assert_eq!(frame.rows()[0], vec![Value::from("x")]);
    }

    #[test]
    fn test_rename_all_rejects_wrong_width() {
        let mut frame = sample();
        let err = frame.rename_all("t", &["a", "b"]).unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_missing_column_lists_available() {
        let frame = sample();
        match frame.index_of("Z") {
            Err(DbError::MissingColumn { available, .. }) => assert_eq!(available.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
