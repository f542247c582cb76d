//! Import plans for every GCF source file, and the stage runners.
//!
//! Layout of the data directory:
//!
//! ```text
//! <data>/dictionary/<table>.csv
//! <data>/export/<stem>.xlsx   (or .csv with the same headers)
//! ```
//!
//! Each stage runs its tables in order and stops at the first failure.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::countries::NameNormalizer;
use crate::error::DbResult;
use crate::importer::{DateColumn, ForeignKey, ImportPlan, ImportReport, TabularImporter, Trim};
use crate::pool::DbPool;
use crate::schema::*;
use crate::splitter::{MultiValueSplitter, SplitPlan};

/// Reference CSVs, loaded with their explicit IDs.
pub static DICTIONARY_PLANS: &[ImportPlan] = &[
    ImportPlan::dictionary(&ACTIVITY_TYPE_DICT),
    ImportPlan::dictionary(&BM_DICT),
    ImportPlan::dictionary(&COUNTRY_DICT),
    ImportPlan::dictionary(&DELIVERY_PARTNER_DICT),
    ImportPlan::dictionary(&ENTITY_TYPE_DICT),
    ImportPlan::dictionary(&ESS_CATEGORY_DICT),
    ImportPlan::dictionary(&MODALITY_DICT),
    ImportPlan::dictionary(&REGION_DICT),
    ImportPlan::dictionary(&SECTOR_DICT),
    ImportPlan::dictionary(&SIZE_DICT),
    ImportPlan::dictionary(&STAGE_DICT),
    ImportPlan::dictionary(&STATUS_DICT),
    ImportPlan::dictionary(&THEME_DICT),
];

static COUNTRY_FKS: &[ForeignKey] = &[ForeignKey::by_name("Region", "region_id", &REGION_DICT)];

static ENTITY_FKS: &[ForeignKey] = &[
    ForeignKey::by_name("Country", "country_id", &COUNTRY_DICT).key("iso3").normalized(),
    ForeignKey::by_name("Type", "entity_type_id", &ENTITY_TYPE_DICT),
    ForeignKey::by_name("Stage", "stage_id", &STAGE_DICT),
    ForeignKey::by_name("BM", "bm_id", &BM_DICT),
    ForeignKey::by_name("Size", "size_id", &SIZE_DICT),
    ForeignKey::by_name("Sector", "sector_id", &SECTOR_DICT),
];

static PROJECT_FKS: &[ForeignKey] = &[
    ForeignKey::by_name("Modality", "modality_id", &MODALITY_DICT).required(),
    ForeignKey::by_name("Entity", "entity_id", &ENTITY).key("code"),
    ForeignKey::by_name("BM", "bm_id", &BM_DICT),
    ForeignKey::by_name("Sector", "sector_id", &SECTOR_DICT).required(),
    ForeignKey::by_name("Theme", "theme_id", &THEME_DICT).required(),
    ForeignKey::by_name("Project Size", "size_id", &SIZE_DICT),
    ForeignKey::by_name("ESS Category", "ess_category_id", &ESS_CATEGORY_DICT),
];

static READINESS_FKS: &[ForeignKey] = &[
    ForeignKey::by_name("Activity", "activity_type_id", &ACTIVITY_TYPE_DICT).required(),
    ForeignKey::by_name("Delivery Partner", "delivery_partner_id", &DELIVERY_PARTNER_DICT),
    ForeignKey::by_name("Region", "region_id", &REGION_DICT).key("code"),
    ForeignKey::by_name("Status", "status_id", &STATUS_DICT).required(),
];

/// Data exports, in dependency order (projects reference entities).
pub static EXPORT_PLANS: &[ImportPlan] = &[
    ImportPlan {
        table: &COUNTRY,
        source: "country",
        include_id: false,
        drop_trailing: 4,
        drop_columns: &[],
        trim: &[],
        foreign_keys: COUNTRY_FKS,
        dates: &[],
    },
    ImportPlan {
        table: &ENTITY,
        source: "entity",
        include_id: false,
        drop_trailing: 2,
        drop_columns: &[],
        trim: &[("Size", Trim::Start)],
        foreign_keys: ENTITY_FKS,
        dates: &[],
    },
    ImportPlan {
        table: &PROJECT,
        source: "project",
        include_id: false,
        drop_trailing: 0,
        drop_columns: &["Countries"],
        trim: &[],
        foreign_keys: PROJECT_FKS,
        dates: &[],
    },
    ImportPlan {
        table: &READINESS,
        source: "readiness",
        include_id: false,
        drop_trailing: 0,
        drop_columns: &["Country"],
        trim: &[("Delivery Partner", Trim::End)],
        foreign_keys: READINESS_FKS,
        dates: &[DateColumn {
            source: "Approved Date",
            format: "%b %d, %Y",
        }],
    },
];

/// Country join tables, split from the same exports.
pub static SPLIT_PLANS: &[SplitPlan] = &[
    SplitPlan {
        table: &PROJECT_COUNTRY,
        source: "project",
        column: "Countries",
        delimiter: ", ",
        reference: &COUNTRY_DICT,
        key: "iso3",
    },
    SplitPlan {
        table: &READINESS_COUNTRY,
        source: "readiness",
        column: "Country",
        delimiter: ", ",
        reference: &COUNTRY_DICT,
        key: "iso3",
    },
];

pub fn dictionary_path(data_dir: &Path, stem: &str) -> PathBuf {
    data_dir.join("dictionary").join(format!("{}.csv", stem))
}

/// `<data>/export/<stem>.xlsx`, or the `.csv` sibling if only that exists.
pub fn export_path(data_dir: &Path, stem: &str) -> PathBuf {
    let dir = data_dir.join("export");
    let xlsx = dir.join(format!("{}.xlsx", stem));
    let csv = dir.join(format!("{}.csv", stem));
    if !xlsx.exists() && csv.exists() {
        csv
    } else {
        xlsx
    }
}

pub fn import_dictionaries(pool: &DbPool, data_dir: &Path) -> DbResult<Vec<ImportReport>> {
    let importer = TabularImporter::new(pool);
    let reports = DICTIONARY_PLANS
        .iter()
        .map(|plan| importer.import_file(plan, &dictionary_path(data_dir, plan.source)))
        .collect::<DbResult<Vec<_>>>()?;

    info!(tables = reports.len(), "Dictionaries imported");
    Ok(reports)
}

pub fn import_exports(
    pool: &DbPool,
    data_dir: &Path,
    normalizer: &dyn NameNormalizer,
) -> DbResult<Vec<ImportReport>> {
    let importer = TabularImporter::new(pool).with_normalizer(normalizer);
    let reports = EXPORT_PLANS
        .iter()
        .map(|plan| importer.import_file(plan, &export_path(data_dir, plan.source)))
        .collect::<DbResult<Vec<_>>>()?;

    info!(tables = reports.len(), "Exports imported");
    Ok(reports)
}

pub fn import_join_tables(
    pool: &DbPool,
    data_dir: &Path,
    normalizer: &dyn NameNormalizer,
) -> DbResult<Vec<ImportReport>> {
    let splitter = MultiValueSplitter::new(pool).with_normalizer(normalizer);
    let reports = SPLIT_PLANS
        .iter()
        .map(|plan| splitter.import_file(plan, &export_path(data_dir, plan.source)))
        .collect::<DbResult<Vec<_>>>()?;

    info!(tables = reports.len(), "Join tables imported");
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::{default_overrides, CountryNormalizer};
    use crate::error::DbError;
    use crate::migrations::run_migrations;
    use crate::queries::{count_rows, fetch_rows};
    use crate::value::Value;

    fn write(path: PathBuf, lines: &[&str]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, lines.join("\n") + "\n").unwrap();
    }

    fn fixture(dir: &Path) {
        let dict = |stem: &str, lines: &[&str]| write(dictionary_path(dir, stem), lines);
        dict("activity_type_dict", &["id,name", "1,Readiness", "2,NAP"]);
        dict("bm_dict", &["id,name", "1,Grant", "2,Loan"]);
        dict("country_dict", &["id,name,iso2,iso3,code", "5,Kenya,KE,KEN,404", "7,Uganda,UG,UGA,800"]);
        dict("delivery_partner_dict", &["id,name", "1,UNEP"]);
        dict("entity_type_dict", &["id,name", "1,Direct", "2,International"]);
        dict("ess_category_dict", &["id,name", "1,A", "2,B"]);
        dict("modality_dict", &["id,name", "1,Project"]);
        dict("region_dict", &["id,name,code", "1,Asia-Pacific,APAC", "2,Africa,AF"]);
        dict("sector_dict", &["id,name", "1,Public", "2,Private"]);
        dict("size_dict", &["id,name", "1,Small", "2,Medium"]);
        dict("stage_dict", &["id,name", "1,Accredited"]);
        dict("status_dict", &["id,name", "1,Approved"]);
        dict("theme_dict", &["id,name", "1,Adaptation", "2,Mitigation"]);

        let export = |stem: &str, lines: &[&str]| write(dir.join("export").join(format!("{}.csv", stem)), lines);
        export(
            "country",
            &[
                "ISO3,Country Name,Region,SIDS,LDC,Projects,Readiness,FA,Total",
                "KEN,Kenya,Africa,No,No,3,2,100,200",
            ],
        );
        export(
            "entity",
            &[
                "Code,Name,Country,DAE,Type,Stage,BM,Size,Sector,Projects,Total",
                "E001,Acme Fund,Kenya,Yes,Direct,Accredited,Grant, Small,Public,1,100",
                "E002,Global Bank,,No,International,Accredited,Loan,Medium,Private,1,100",
            ],
        );
        export(
            "project",
            &[
                "Ref,Modality,Project Name,Entity,BM,Sector,Theme,Project Size,ESS Category,FA Financing,Countries",
                "FP001,Project,Water resilience,E001,Grant,Public,Adaptation,Small,B,\"1,000,000\",\"Kenya, Uganda\"",
                "FP002,Project,Solar grid,E002,Loan,Private,Mitigation,Medium,A,2500000,Atlantis",
            ],
        );
        export(
            "readiness",
            &[
                "Ref,Activity,Title,Delivery Partner,Region,SIDS,LDC,NAP,Status,Approved Date,Financing,Country",
                "RDY001,NAP,NAP support,UNEP  ,AF,No,Yes,Yes,Approved,\"Mar 05, 2021\",300000,Uganda",
            ],
        );
    }

    #[test]
    fn test_full_import_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());

        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();

        let dictionaries = import_dictionaries(&pool, dir.path()).unwrap();
        assert_eq!(dictionaries.len(), DICTIONARY_PLANS.len());

        let normalizer = CountryNormalizer::load(&pool, &default_overrides()).unwrap();
        let exports = import_exports(&pool, dir.path(), &normalizer).unwrap();
        assert_eq!(exports.iter().map(|r| r.rows_inserted).sum::<usize>(), 1 + 2 + 2 + 1);

        let joins = import_join_tables(&pool, dir.path(), &normalizer).unwrap();
        assert_eq!(joins[0].rows_inserted, 3);
        assert_eq!(joins[0].unresolved[0].missing, vec!["Atlantis".to_string()]);
        assert_eq!(joins[1].rows_inserted, 1);

        let entities = fetch_rows(&pool, &ENTITY).unwrap();
        assert_eq!(entities[0][3], Value::Integer(5));
        assert_eq!(entities[0][8], Value::Integer(1));
        assert_eq!(entities[1][3], Value::Null);

        let projects = fetch_rows(&pool, &PROJECT).unwrap();
        assert_eq!(projects[0][4], Value::Integer(1));
        assert_eq!(projects[0][10], Value::Real(1_000_000.0));

        let readiness = fetch_rows(&pool, &READINESS).unwrap();
        assert_eq!(readiness[0][4], Value::Integer(1));
        assert_eq!(readiness[0][10], Value::from("2021-03-05"));

        assert_eq!(
            fetch_rows(&pool, &PROJECT_COUNTRY).unwrap(),
            vec![
                vec![Value::Integer(1), Value::Integer(1), Value::Integer(5)],
                vec![Value::Integer(2), Value::Integer(1), Value::Integer(7)],
                vec![Value::Integer(3), Value::Integer(2), Value::Null],
            ]
        );
    }

    #[test]
    fn test_blank_spreadsheet_row_keeps_join_owners_aligned() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        std::fs::remove_file(dir.path().join("export/project.csv")).unwrap();

        let rows: [&[&str]; 4] = [
            &[
                "Ref", "Modality", "Project Name", "Entity", "BM", "Sector", "Theme",
                "Project Size", "ESS Category", "FA Financing", "Countries",
            ],
            &["FP001", "Project", "Water resilience", "E001", "Grant", "Public", "Adaptation", "Small", "B", "1000000", "Kenya"],
            &[],
            &["FP002", "Project", "Solar grid", "E002", "Loan", "Private", "Mitigation", "Medium", "A", "2500000", "Uganda, Kenya"],
        ];
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                sheet.write_string(r as u32, c as u16, *cell).unwrap();
            }
        }
        workbook.save(dir.path().join("export/project.xlsx")).unwrap();

        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();
        import_dictionaries(&pool, dir.path()).unwrap();
        let normalizer = CountryNormalizer::load(&pool, &default_overrides()).unwrap();
        import_exports(&pool, dir.path(), &normalizer).unwrap();
        import_join_tables(&pool, dir.path(), &normalizer).unwrap();

        let projects = fetch_rows(&pool, &PROJECT).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1][0], Value::Integer(2));
        assert_eq!(projects[1][1], Value::from("FP002"));

        assert_eq!(
            fetch_rows(&pool, &PROJECT_COUNTRY).unwrap(),
            vec![
                vec![Value::Integer(1), Value::Integer(1), Value::Integer(5)],
                vec![Value::Integer(2), Value::Integer(2), Value::Integer(7)],
                vec![Value::Integer(3), Value::Integer(2), Value::Integer(5)],
            ]
        );
    }

    #[test]
    fn test_stage_stops_at_first_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dictionary_path(dir.path(), "activity_type_dict"), &["id,name", "1,Readiness"]);

        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();

        let err = import_dictionaries(&pool, dir.path()).unwrap_err();
        assert!(matches!(err, DbError::SourceRead { .. }));
        assert_eq!(count_rows(&pool, &ACTIVITY_TYPE_DICT).unwrap(), 1);
        assert_eq!(count_rows(&pool, &BM_DICT).unwrap(), 0);
    }

    #[test]
    fn test_export_path_prefers_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_path(dir.path(), "project").ends_with("export/project.xlsx"));
        write(dir.path().join("export/project.csv"), &["Ref"]);
        assert!(export_path(dir.path(), "project").ends_with("export/project.csv"));
    }
}
