//! Tabular importer: source file → reshaped rows → one atomic bulk insert.
//!
//! An [`ImportPlan`] describes how a source table maps onto a destination
//! table. The importer applies the plan in a fixed order: drop derived
//! columns, trim, resolve foreign keys, parse dates, rename positionally,
//! coerce to the declared column types, insert.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params_from_iter, Transaction};
use tracing::{debug, error, info, warn};

use crate::countries::NameNormalizer;
use crate::error::{DbError, DbResult};
use crate::frame::Frame;
use crate::pool::DbPool;
use crate::resolver::IdResolver;
use crate::schema::{Column, TableSchema};
use crate::source::read_table;
use crate::value::Value;

/// What to do when a foreign-key name cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Store NULL and log a warning.
    Optional,
    /// Fail the import, listing the unresolved names.
    Required,
}

/// Where the resolved ID column ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    InPlace,
    At(usize),
}

/// Which side of a text cell loses its whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Start,
    End,
    Both,
}

/// A name column that is replaced by the ID of a reference row.
#[derive(Debug)]
pub struct ForeignKey {
    /// Header in the source file.
    pub source: &'static str,
    /// Destination column name.
    pub column: &'static str,
    pub reference: &'static TableSchema,
    /// Column of `reference` the names are matched against.
    pub key: &'static str,
    /// Pass names through the country normalizer first.
    pub normalize: bool,
    pub placement: Placement,
    pub policy: NullPolicy,
}

impl ForeignKey {
    /// An optional, in-place lookup by `name`.
    pub const fn by_name(source: &'static str, column: &'static str, reference: &'static TableSchema) -> Self {
        Self {
            source,
            column,
            reference,
            key: "name",
            normalize: false,
            placement: Placement::InPlace,
            policy: NullPolicy::Optional,
        }
    }

    pub const fn key(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }

    pub const fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub const fn at(mut self, index: usize) -> Self {
        self.placement = Placement::At(index);
        self
    }

    pub const fn required(mut self) -> Self {
        self.policy = NullPolicy::Required;
        self
    }
}

/// A text column holding dates in a non-ISO format.
#[derive(Debug)]
pub struct DateColumn {
    pub source: &'static str,
    /// `chrono` format string, e.g. `%b %d, %Y`.
    pub format: &'static str,
}

/// How one source table becomes one destination table.
#[derive(Debug)]
pub struct ImportPlan {
    pub table: &'static TableSchema,
    /// File stem under the data directory.
    pub source: &'static str,
    /// Whether the source carries explicit IDs (dictionaries do, exports don't).
    pub include_id: bool,
    pub drop_trailing: usize,
    pub drop_columns: &'static [&'static str],
    pub trim: &'static [(&'static str, Trim)],
    pub foreign_keys: &'static [ForeignKey],
    pub dates: &'static [DateColumn],
}

impl ImportPlan {
    /// A reference CSV loaded as-is, IDs included.
    pub const fn dictionary(table: &'static TableSchema) -> Self {
        Self {
            table,
            source: table.name,
            include_id: true,
            drop_trailing: 0,
            drop_columns: &[],
            trim: &[],
            foreign_keys: &[],
            dates: &[],
        }
    }

    /// Destination columns in positional order.
    pub fn target_columns(&self) -> Vec<&'static Column> {
        if self.include_id {
            self.table.columns.iter().collect()
        } else {
            self.table.data_columns()
        }
    }
}

/// Names of one FK column that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub column: &'static str,
    pub count: usize,
    pub missing: Vec<String>,
}

/// Rows ready for insertion, in destination column order.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Value>>,
    pub unresolved: Vec<Unresolved>,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub table: &'static str,
    pub rows_inserted: usize,
    pub unresolved: Vec<Unresolved>,
}

/// Runs [`ImportPlan`]s against a database.
pub struct TabularImporter<'a> {
    pool: &'a DbPool,
    normalizer: Option<&'a dyn NameNormalizer>,
}

impl<'a> TabularImporter<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool, normalizer: None }
    }

    /// Use `normalizer` for foreign keys marked `normalize`.
    /// Without one, names are looked up unchanged.
    pub fn with_normalizer(mut self, normalizer: &'a dyn NameNormalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    fn normalize(&self, name: String) -> String {
        match self.normalizer {
            Some(normalizer) => normalizer.normalize(&name).unwrap_or(name),
            None => name,
        }
    }

    /// Read `path`, apply `plan`, and insert the result.
    pub fn import_file(&self, plan: &ImportPlan, path: &Path) -> DbResult<ImportReport> {
        info!(table = plan.table.name, path = %path.display(), "Importing");
        let frame = read_table(path)?;
        let prepared = self.prepare(plan, frame)?;
        let rows_inserted = bulk_insert(self.pool, plan.table, &prepared.columns, &prepared.rows)?;

        info!(table = plan.table.name, rows = rows_inserted, "Imported");
        Ok(ImportReport {
            table: plan.table.name,
            rows_inserted,
            unresolved: prepared.unresolved,
        })
    }

    /// Apply every reshaping step of `plan` to `frame`.
    pub fn prepare(&self, plan: &ImportPlan, mut frame: Frame) -> DbResult<Prepared> {
        let table = plan.table.name;

        frame.drop_trailing(plan.drop_trailing);
        for name in plan.drop_columns {
            frame.drop_column(name)?;
        }

        for (name, trim) in plan.trim {
            let trim = *trim;
            frame.map_column(name, |cell| match cell {
                Value::Text(s) => Value::Text(
                    match trim {
                        Trim::Start => s.trim_start(),
                        Trim::End => s.trim_end(),
                        Trim::Both => s.trim(),
                    }
                    .to_string(),
                ),
                other => other.clone(),
            })?;
        }

        let mut unresolved = Vec::new();
        for fk in plan.foreign_keys {
            if let Some(miss) = self.resolve_foreign_key(table, fk, &mut frame)? {
                unresolved.push(miss);
            }
        }

        for date in plan.dates {
            parse_dates(table, date, &mut frame)?;
        }

        let targets = plan.target_columns();
        let names: Vec<&'static str> = targets.iter().map(|c| c.name).collect();
        frame.rename_all(table, &names)?;

        let mut rows = frame.into_rows();
        for (index, row) in rows.iter_mut().enumerate() {
            for (cell, column) in row.iter_mut().zip(&targets) {
                let value = std::mem::replace(cell, Value::Null);
                *cell = value.coerce(column.kind).map_err(|reason| DbError::InvalidValue {
                    table: table.to_string(),
                    column: column.name.to_string(),
                    row: index + 1,
                    reason,
                })?;
            }
        }

        debug!(table, rows = rows.len(), columns = names.len(), "Prepared rows");
        Ok(Prepared {
            columns: names,
            rows,
            unresolved,
        })
    }

    fn resolve_foreign_key(
        &self,
        table: &str,
        fk: &ForeignKey,
        frame: &mut Frame,
    ) -> DbResult<Option<Unresolved>> {
        let resolver = IdResolver::load(self.pool, fk.reference, fk.key)?;

        let names: Vec<Value> = frame
            .column(fk.source)?
            .into_iter()
            .map(|cell| match cell.as_key() {
                Some(name) if fk.normalize => Value::Text(self.normalize(name)),
                Some(name) => Value::Text(name),
                None => Value::Null,
            })
            .collect();

        let resolution = resolver.resolve_all(&names);
        frame.replace_column(fk.source, fk.column, resolution.values)?;
        if let Placement::At(index) = fk.placement {
            frame.move_column(fk.column, index)?;
        }

        if resolution.miss_count == 0 {
            return Ok(None);
        }

        let missing: Vec<String> = resolution.missing.into_iter().collect();
        if fk.policy == NullPolicy::Required {
            return Err(DbError::UnresolvedForeignKey {
                table: table.to_string(),
                column: fk.column.to_string(),
                missing,
            });
        }

        warn!(
            table,
            column = fk.column,
            reference = fk.reference.name,
            misses = resolution.miss_count,
            missing = ?missing,
            "Unresolved names stored as NULL"
        );
        Ok(Some(Unresolved {
            column: fk.column,
            count: resolution.miss_count,
            missing,
        }))
    }
}

/// Rewrite a date column to ISO `YYYY-MM-DD`.
///
/// Cells already in ISO form (spreadsheet date cells) are accepted as-is.
fn parse_dates(table: &str, date: &DateColumn, frame: &mut Frame) -> DbResult<()> {
    let mut parsed = Vec::with_capacity(frame.len());
    for (index, cell) in frame.column(date.source)?.into_iter().enumerate() {
        let value = match cell {
            Value::Null => Value::Null,
            Value::Text(s) => {
                let s = s.trim();
                let day = NaiveDate::parse_from_str(s, date.format)
                    .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                    .map_err(|_| DbError::InvalidValue {
                        table: table.to_string(),
                        column: date.source.to_string(),
                        row: index + 1,
                        reason: format!("'{}' does not match '{}'", s, date.format),
                    })?;
                Value::Text(day.format("%Y-%m-%d").to_string())
            }
            other => {
                return Err(DbError::InvalidValue {
                    table: table.to_string(),
                    column: date.source.to_string(),
                    row: index + 1,
                    reason: format!("expected a date, found {}", other),
                })
            }
        };
        parsed.push(value);
    }
    frame.replace_column(date.source, date.source, parsed)
}

/// Insert `rows` into `table` in a single transaction.
///
/// On any failure nothing is committed and the error carries the number of
/// rows that were attempted.
pub fn bulk_insert(
    pool: &DbPool,
    table: &TableSchema,
    columns: &[&str],
    rows: &[Vec<Value>],
) -> DbResult<usize> {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        placeholders
    );

    pool.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let result = match insert_rows(&tx, &sql, rows) {
            Ok(n) => tx.commit().map(|_| n),
            Err(e) => Err(e),
        };

        result.map_err(|source| {
            error!(table = table.name, attempted = rows.len(), error = %source, "Bulk insert rolled back");
            DbError::BulkInsert {
                table: table.name.to_string(),
                attempted: rows.len(),
                source,
            }
        })
    })
}

fn insert_rows(tx: &Transaction<'_>, sql: &str, rows: &[Vec<Value>]) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare(sql)?;
    for row in rows {
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::schema::{COUNTRY_DICT, ENTITY, READINESS, REGION_DICT, SECTOR_DICT, STATUS_DICT};
    use std::io::Write;

    fn pool() -> DbPool {
        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();
        pool.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO region_dict (id, name, code) VALUES (1, 'Asia-Pacific', 'APAC'), (2, 'Africa', 'AF');
                 INSERT INTO country_dict (id, name, iso2, iso3, code) VALUES (5, 'Kenya', 'KE', 'KEN', '404');
                 INSERT INTO sector_dict (id, name) VALUES (1, 'Public'), (2, 'Private');
                 INSERT INTO status_dict (id, name) VALUES (1, 'Approved');",
            )?;
            Ok(())
        })
        .unwrap();
        pool
    }

    fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> Frame {
        Frame::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn count(pool: &DbPool, table: &str) -> i64 {
        pool.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    static ENTITY_FKS: &[ForeignKey] = &[
        ForeignKey::by_name("Country", "country_id", &COUNTRY_DICT).key("iso3").normalized(),
        ForeignKey::by_name("Sector", "sector_id", &SECTOR_DICT),
    ];

    static ENTITY_PLAN: ImportPlan = ImportPlan {
        table: &ENTITY,
        source: "entity",
        include_id: false,
        drop_trailing: 1,
        drop_columns: &["Notes"],
        trim: &[("Name", Trim::Both)],
        foreign_keys: ENTITY_FKS,
        dates: &[],
    };

    fn entity_frame(country: Value, sector: &str) -> Frame {
        frame(
            &["Code", "Name", "Country", "DAE", "Notes", "Type", "Stage", "BM", "Size", "Sector", "Computed"],
            vec![vec![
                Value::from("E001"),
                Value::from("  Acme Fund "),
                country,
                Value::from("yes"),
                Value::from("drop me"),
                Value::Null,
                Value::Null,
                Value::Null,
                Value::Null,
                Value::from(sector),
                Value::Integer(42),
            ]],
        )
    }

    #[test]
    fn test_dictionary_csv_keeps_explicit_ids() {
        let pool = pool();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme_dict.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "id,name").unwrap();
        writeln!(file, "7,Adaptation").unwrap();
        writeln!(file, "9,Mitigation").unwrap();

        let plan = ImportPlan::dictionary(&crate::schema::THEME_DICT);
        let report = TabularImporter::new(&pool).import_file(&plan, &path).unwrap();
        assert_eq!(report.rows_inserted, 2);

        let id: i64 = pool
            .with_conn(|conn| Ok(conn.query_row("SELECT id FROM theme_dict WHERE name = 'Mitigation'", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(id, 9);
    }

    struct KenyaOnly;

    impl NameNormalizer for KenyaOnly {
        fn normalize(&self, name: &str) -> Option<String> {
            (name == "Kenya").then(|| "KEN".to_string())
        }
    }

    #[test]
    fn test_prepare_resolves_in_place_and_coerces() {
        let pool = pool();
        let importer = TabularImporter::new(&pool).with_normalizer(&KenyaOnly);
        let prepared = importer
            .prepare(&ENTITY_PLAN, entity_frame(Value::from("Kenya"), "Private"))
            .unwrap();

        assert_eq!(prepared.columns, ENTITY.data_columns().iter().map(|c| c.name).collect::<Vec<_>>());
        let row = &prepared.rows[0];
        assert_eq!(row[0], Value::from("E001"));
        assert_eq!(row[1], Value::from("Acme Fund"));
        assert_eq!(row[2], Value::Integer(5));
        assert_eq!(row[3], Value::Boolean(true));
        assert_eq!(row[8], Value::Integer(2));
        assert!(prepared.unresolved.is_empty());
    }

    #[test]
    fn test_optional_miss_becomes_null_and_is_reported() {
        let pool = pool();
        let importer = TabularImporter::new(&pool).with_normalizer(&KenyaOnly);
        let prepared = importer
            .prepare(&ENTITY_PLAN, entity_frame(Value::from("Atlantis"), "Private"))
            .unwrap();

        assert_eq!(prepared.rows[0][2], Value::Null);
        assert_eq!(
            prepared.unresolved,
            vec![Unresolved {
                column: "country_id",
                count: 1,
                missing: vec!["Atlantis".to_string()],
            }]
        );
    }

    #[test]
    fn test_required_miss_fails_import() {
        static FKS: &[ForeignKey] = &[ForeignKey::by_name("Sector", "sector_id", &SECTOR_DICT).required()];
        static PLAN: ImportPlan = ImportPlan {
            table: &ENTITY,
            source: "entity",
            include_id: false,
            drop_trailing: 1,
            drop_columns: &["Notes"],
            trim: &[],
            foreign_keys: FKS,
            dates: &[],
        };

        let pool = pool();
        let err = TabularImporter::new(&pool)
            .prepare(&PLAN, entity_frame(Value::Null, "Charity"))
            .unwrap_err();
        match err {
            DbError::UnresolvedForeignKey { column, missing, .. } => {
                assert_eq!(column, "sector_id");
                assert_eq!(missing, vec!["Charity".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_explicit_placement_moves_id_column() {
        static FKS: &[ForeignKey] = &[ForeignKey::by_name("Region", "region_id", &REGION_DICT).at(2)];
        static PLAN: ImportPlan = ImportPlan {
            table: &crate::schema::COUNTRY,
            source: "country",
            include_id: false,
            drop_trailing: 0,
            drop_columns: &[],
            trim: &[],
            foreign_keys: FKS,
            dates: &[],
        };

        let pool = pool();
        let prepared = TabularImporter::new(&pool)
            .prepare(
                &PLAN,
                frame(
                    &["Region", "ISO3", "Country Name", "SIDS", "LDC"],
                    vec![vec![
                        Value::from("Africa"),
                        Value::from("KEN"),
                        Value::from("Kenya"),
                        Value::from("N"),
                        Value::from("N"),
                    ]],
                ),
            )
            .unwrap();

        assert_eq!(
            prepared.rows[0],
            vec![
                Value::from("KEN"),
                Value::from("Kenya"),
                Value::Integer(2),
                Value::Boolean(false),
                Value::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_column_count_mismatch_fails_fast() {
        let pool = pool();
        let plan = ImportPlan::dictionary(&REGION_DICT);
        let err = TabularImporter::new(&pool)
            .prepare(&plan, frame(&["id", "name"], vec![vec![Value::Integer(3), Value::from("Europe")]]))
            .unwrap_err();
        assert!(matches!(err, DbError::SchemaMismatch { expected: 3, found: 2, .. }));
    }

    #[test]
    fn test_invalid_value_names_row_and_column() {
        let pool = pool();
        let plan = ImportPlan::dictionary(&REGION_DICT);
        let err = TabularImporter::new(&pool)
            .prepare(
                &plan,
                frame(
                    &["id", "name", "code"],
                    vec![
                        vec![Value::from("3"), Value::from("Europe"), Value::from("EU")],
                        vec![Value::from("four"), Value::from("Americas"), Value::from("AM")],
                    ],
                ),
            )
            .unwrap_err();
        match err {
            DbError::InvalidValue { column, row, .. } => {
                assert_eq!(column, "id");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dates_parsed_with_configured_format() {
        static FKS: &[ForeignKey] = &[
            ForeignKey::by_name("Region", "region_id", &REGION_DICT).key("code"),
            ForeignKey::by_name("Status", "status_id", &STATUS_DICT).required(),
        ];
        static PLAN: ImportPlan = ImportPlan {
            table: &READINESS,
            source: "readiness",
            include_id: false,
            drop_trailing: 0,
            drop_columns: &["Country"],
            trim: &[],
            foreign_keys: FKS,
            dates: &[DateColumn { source: "Approved Date", format: "%b %d, %Y" }],
        };

        let pool = pool();
        let headers = [
            "Ref", "Activity", "Title", "Delivery Partner", "Region", "SIDS", "LDC", "NAP", "Status",
            "Approved Date", "Financing", "Country",
        ];
        let row = vec![
            Value::from("RDY-001"),
            Value::Integer(1),
            Value::from("NAP support"),
            Value::Null,
            Value::from("AF"),
            Value::from("Yes"),
            Value::from("No"),
            Value::from("Yes"),
            Value::from("Approved"),
            Value::from("Mar 05, 2021"),
            Value::from("1,250,000.50"),
            Value::from("Kenya"),
        ];
        let prepared = TabularImporter::new(&pool)
            .prepare(&PLAN, frame(&headers, vec![row]))
            .unwrap();

        let row = &prepared.rows[0];
        assert_eq!(row[4], Value::Integer(2));
        assert_eq!(row[8], Value::Integer(1));
        assert_eq!(row[9], Value::from("2021-03-05"));
        assert_eq!(row[10], Value::Real(1_250_000.5));
    }

    #[test]
    fn test_one_bad_row_rolls_back_whole_table() {
        let pool = pool();
        let mut rows: Vec<Vec<Value>> = (1..=100)
            .map(|i| vec![Value::Integer(100 + i), Value::Text(format!("Theme {}", i))])
            .collect();
        rows[99][1] = Value::from("Theme 1");

        let err = bulk_insert(&pool, &crate::schema::THEME_DICT, &["id", "name"], &rows).unwrap_err();
        match err {
            DbError::BulkInsert { attempted, .. } => assert_eq!(attempted, 100),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(count(&pool, "theme_dict"), 0);
    }
}
