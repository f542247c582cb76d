//! Typed mirror of `migrations/schema.sql`.
//!
//! Column order here is the positional contract every importer relies on:
//! it must match the `CREATE TABLE` declaration order exactly.

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    /// ISO `YYYY-MM-DD` stored as text.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A table (or view) with its declared columns.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns excluding the surrogate `id`, in declaration order.
    pub fn data_columns(&self) -> Vec<&'static Column> {
        self.columns.iter().filter(|c| c.name != "id").collect()
    }
}

use ColumnKind::{Boolean, Date, Integer, Real, Text};

const ID: Column = Column::new("id", Integer);
const NAME: Column = Column::new("name", Text);

/// Shape shared by the plain `(id, name)` dictionaries.
const NAMED_DICT: &[Column] = &[ID, NAME];

// Data dictionaries

pub static ACTIVITY_TYPE_DICT: TableSchema = TableSchema { name: "activity_type_dict", columns: NAMED_DICT };
pub static BM_DICT: TableSchema = TableSchema { name: "bm_dict", columns: NAMED_DICT };
pub static DELIVERY_PARTNER_DICT: TableSchema = TableSchema { name: "delivery_partner_dict", columns: NAMED_DICT };
pub static ENTITY_TYPE_DICT: TableSchema = TableSchema { name: "entity_type_dict", columns: NAMED_DICT };
pub static ESS_CATEGORY_DICT: TableSchema = TableSchema { name: "ess_category_dict", columns: NAMED_DICT };
pub static MODALITY_DICT: TableSchema = TableSchema { name: "modality_dict", columns: NAMED_DICT };
pub static SECTOR_DICT: TableSchema = TableSchema { name: "sector_dict", columns: NAMED_DICT };
pub static SIZE_DICT: TableSchema = TableSchema { name: "size_dict", columns: NAMED_DICT };
pub static STAGE_DICT: TableSchema = TableSchema { name: "stage_dict", columns: NAMED_DICT };
pub static STATUS_DICT: TableSchema = TableSchema { name: "status_dict", columns: NAMED_DICT };
pub static THEME_DICT: TableSchema = TableSchema { name: "theme_dict", columns: NAMED_DICT };

pub static REGION_DICT: TableSchema = TableSchema {
    name: "region_dict",
    columns: &[ID, NAME, Column::new("code", Text)],
};

pub static COUNTRY_DICT: TableSchema = TableSchema {
    name: "country_dict",
    columns: &[
        ID,
        NAME,
        Column::new("iso2", Text),
        Column::new("iso3", Text),
        Column::new("code", Text),
    ],
};

// Export tables

pub static COUNTRY: TableSchema = TableSchema {
    name: "country",
    columns: &[
        ID,
        Column::new("iso3", Text),
        NAME,
        Column::new("region_id", Integer),
        Column::new("is_sids", Boolean),
        Column::new("is_ldc", Boolean),
    ],
};

pub static ENTITY: TableSchema = TableSchema {
    name: "entity",
    columns: &[
        ID,
        Column::new("code", Text),
        NAME,
        Column::new("country_id", Integer),
        Column::new("is_dae", Boolean),
        Column::new("entity_type_id", Integer),
        Column::new("stage_id", Integer),
        Column::new("bm_id", Integer),
        Column::new("size_id", Integer),
        Column::new("sector_id", Integer),
    ],
};

pub static PROJECT: TableSchema = TableSchema {
    name: "project",
    columns: &[
        ID,
        Column::new("ref", Text),
        Column::new("modality_id", Integer),
        NAME,
        Column::new("entity_id", Integer),
        Column::new("bm_id", Integer),
        Column::new("sector_id", Integer),
        Column::new("theme_id", Integer),
        Column::new("size_id", Integer),
        Column::new("ess_category_id", Integer),
        Column::new("financing_usd", Real),
    ],
};

pub static READINESS: TableSchema = TableSchema {
    name: "readiness",
    columns: &[
        ID,
        Column::new("ref", Text),
        Column::new("activity_type_id", Integer),
        NAME,
        Column::new("delivery_partner_id", Integer),
        Column::new("region_id", Integer),
        Column::new("has_sids", Boolean),
        Column::new("has_ldc", Boolean),
        Column::new("is_nap", Boolean),
        Column::new("status_id", Integer),
        Column::new("approved_date", Date),
        Column::new("financing_usd", Real),
    ],
};

// Join tables

pub static PROJECT_COUNTRY: TableSchema = TableSchema {
    name: "project_country",
    columns: &[ID, Column::new("project_id", Integer), Column::new("country_id", Integer)],
};

pub static READINESS_COUNTRY: TableSchema = TableSchema {
    name: "readiness_country",
    columns: &[ID, Column::new("readiness_id", Integer), Column::new("country_id", Integer)],
};

// Views

/// Country dictionary enriched with SIDS/LDC flags and region from the export.
pub static COUNTRY_NODE: TableSchema = TableSchema {
    name: "country_node",
    columns: &[
        ID,
        NAME,
        Column::new("iso2", Text),
        Column::new("iso3", Text),
        Column::new("code", Text),
        Column::new("is_sids", Boolean),
        Column::new("is_ldc", Boolean),
        Column::new("region_id", Integer),
    ],
};

/// Every base table, in load order.
pub static ALL_TABLES: &[&TableSchema] = &[
    &ACTIVITY_TYPE_DICT,
    &BM_DICT,
    &COUNTRY_DICT,
    &DELIVERY_PARTNER_DICT,
    &ENTITY_TYPE_DICT,
    &ESS_CATEGORY_DICT,
    &MODALITY_DICT,
    &REGION_DICT,
    &SECTOR_DICT,
    &SIZE_DICT,
    &STAGE_DICT,
    &STATUS_DICT,
    &THEME_DICT,
    &COUNTRY,
    &ENTITY,
    &PROJECT,
    &READINESS,
    &PROJECT_COUNTRY,
    &READINESS_COUNTRY,
];

pub static ALL_VIEWS: &[&TableSchema] = &[&COUNTRY_NODE];
