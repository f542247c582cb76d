//! Relational store commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::config::Config;
use crate::output;

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create or migrate the SQLite schema
    Init,

    /// Show row counts per table
    Status,
}

pub fn execute(cmd: DbCommands, config: &Config) -> Result<()> {
    match cmd {
        DbCommands::Init => cmd_init(config),
        DbCommands::Status => cmd_status(config),
    }
}

fn cmd_init(config: &Config) -> Result<()> {
    let path = &config.database.path;
    gcf_db::init_pool(path).with_context(|| format!("Failed to initialize {}", path.display()))?;
    println!("{} {}", "Database ready:".green().bold(), path.display());
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let pool = gcf_db::init_pool(&config.database.path)?;
    let counts = gcf_db::queries::table_counts(&pool, gcf_db::schema::ALL_TABLES)?;
    output::print_table_counts(&config.database.path, &counts);
    Ok(())
}
