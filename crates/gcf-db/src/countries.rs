//! Country name → ISO3 normalization.
//!
//! Exports spell countries freely ("United Kingdom", "Côte d'Ivoire",
//! "KENYA"). Names are matched case-insensitively against the country
//! dictionary's name, ISO3 and ISO2 columns, after consulting an explicit
//! override table. There is no fuzzy matching: anything neither listed nor
//! matching exactly is reported unresolved.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::error::DbResult;
use crate::pool::DbPool;

/// Turns a free-text name into a standard code, or `None` if unknown.
pub trait NameNormalizer {
    fn normalize(&self, name: &str) -> Option<String>;
}

/// Corrections for export spellings that differ from the dictionary.
const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("United Kingdom", "GBR"),
    ("United States", "USA"),
    ("United States of America", "USA"),
    ("Türkiye", "TUR"),
    ("Turkey", "TUR"),
    ("Côte d'Ivoire", "CIV"),
    ("Cote d'Ivoire", "CIV"),
    ("Democratic Republic of the Congo", "COD"),
    ("Congo", "COG"),
    ("Lao PDR", "LAO"),
    ("Lao People's Democratic Republic", "LAO"),
    ("Viet Nam", "VNM"),
    ("Micronesia", "FSM"),
    ("Micronesia (Federated States of)", "FSM"),
    ("Bolivia", "BOL"),
    ("Tanzania", "TZA"),
    ("United Republic of Tanzania", "TZA"),
    ("Eswatini", "SWZ"),
    ("Swaziland", "SWZ"),
    ("Cabo Verde", "CPV"),
    ("Gambia", "GMB"),
    ("The Gambia", "GMB"),
    ("State of Palestine", "PSE"),
];

/// Built-in override table (`name` → ISO3).
pub fn default_overrides() -> BTreeMap<String, String> {
    DEFAULT_OVERRIDES
        .iter()
        .map(|(name, iso3)| (name.to_string(), iso3.to_string()))
        .collect()
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Exact-match country normalizer backed by `country_dict`.
#[derive(Debug, Clone, Default)]
pub struct CountryNormalizer {
    overrides: HashMap<String, String>,
    known: HashMap<String, String>,
}

impl CountryNormalizer {
    /// Build from `(name, iso2, iso3)` dictionary rows plus overrides.
    pub fn new<I>(rows: I, overrides: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>, String)>,
    {
        let mut known = HashMap::new();
        for (name, iso2, iso3) in rows {
            known.insert(fold(&name), iso3.clone());
            if let Some(iso2) = iso2 {
                known.insert(fold(&iso2), iso3.clone());
            }
            known.insert(fold(&iso3), iso3);
        }

        Self {
            overrides: overrides
                .iter()
                .map(|(name, iso3)| (fold(name), iso3.trim().to_uppercase()))
                .collect(),
            known,
        }
    }

    /// Load dictionary rows from `country_dict`.
    pub fn load(pool: &DbPool, overrides: &BTreeMap<String, String>) -> DbResult<Self> {
        let rows: Vec<(String, Option<String>, String)> = pool.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name, iso2, iso3 FROM country_dict")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })?;

        debug!(countries = rows.len(), overrides = overrides.len(), "Loaded country normalizer");
        Ok(Self::new(rows, overrides))
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl NameNormalizer for CountryNormalizer {
    fn normalize(&self, name: &str) -> Option<String> {
        let key = fold(name);
        if key.is_empty() {
            return None;
        }
        self.overrides
            .get(&key)
            .or_else(|| self.known.get(&key))
            .cloned()
    }
}
