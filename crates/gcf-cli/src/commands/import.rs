//! Source file import commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use gcf_db::{CountryNormalizer, DbPool, ImportReport};

use crate::config::Config;
use crate::output;

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Load all reference CSVs
    Dictionaries,

    /// Load the country, entity, project and readiness exports
    Exports,

    /// Split project and readiness country lists into join tables
    Countries,

    /// Run dictionaries, exports and countries in order
    All,
}

pub fn execute(cmd: ImportCommands, config: &Config) -> Result<()> {
    let pool = gcf_db::init_pool(&config.database.path)
        .with_context(|| format!("Failed to open {}", config.database.path.display()))?;

    match cmd {
        ImportCommands::Dictionaries => dictionaries(&pool, config),
        ImportCommands::Exports => exports(&pool, config),
        ImportCommands::Countries => countries(&pool, config),
        ImportCommands::All => {
            dictionaries(&pool, config)?;
            exports(&pool, config)?;
            countries(&pool, config)
        }
    }
}

fn normalizer(pool: &DbPool, config: &Config) -> Result<CountryNormalizer> {
    CountryNormalizer::load(pool, &config.country_overrides()).context("Failed to load country dictionary")
}

fn finish(stage: &str, reports: &[ImportReport]) {
    println!("{}", stage.bold());
    output::print_import_reports(reports);
}

fn dictionaries(pool: &DbPool, config: &Config) -> Result<()> {
    let reports = gcf_db::plans::import_dictionaries(pool, &config.import.data_dir)
        .context("Dictionary import failed")?;
    finish("Dictionaries", &reports);
    Ok(())
}

fn exports(pool: &DbPool, config: &Config) -> Result<()> {
    let normalizer = normalizer(pool, config)?;
    let reports = gcf_db::plans::import_exports(pool, &config.import.data_dir, &normalizer)
        .context("Export import failed")?;
    finish("Exports", &reports);
    Ok(())
}

fn countries(pool: &DbPool, config: &Config) -> Result<()> {
    let normalizer = normalizer(pool, config)?;
    let reports = gcf_db::plans::import_join_tables(pool, &config.import.data_dir, &normalizer)
        .context("Country join import failed")?;
    finish("Country joins", &reports);
    Ok(())
}
