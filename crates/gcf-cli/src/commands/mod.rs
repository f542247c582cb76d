//! CLI command definitions and handlers.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

pub mod db;
pub mod graph;
pub mod import;

/// GCF relational-to-graph loader
#[derive(Parser)]
#[command(name = "gcf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./gcf.toml when present)
    #[arg(short, long, global = true, env = "GCF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// SQLite database path (overrides config and GCF_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory holding dictionary/ and export/ (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Relational store management
    #[command(subcommand)]
    Db(db::DbCommands),

    /// Load source files into SQLite
    #[command(subcommand)]
    Import(import::ImportCommands),

    /// Knowledge Graph commands
    #[command(subcommand)]
    Graph(graph::GraphCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(db) = self.db {
            config.database.path = db;
        }
        if let Some(data_dir) = self.data_dir {
            config.import.data_dir = data_dir;
        }

        match self.command {
            Commands::Db(cmd) => db::execute(cmd, &config),
            Commands::Import(cmd) => import::execute(cmd, &config),
            Commands::Graph(cmd) => graph::execute(cmd, &config).await,
        }
    }
}
