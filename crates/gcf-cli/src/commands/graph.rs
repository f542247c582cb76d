//! Knowledge Graph CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tracing::info;

use gcf_graph::catalog::{catalog_violations, ENTITY_SYNCS, REFERENCE_SYNCS};
use gcf_graph::{BatchWriter, GraphClient, GraphStore, MemoryGraph};

use crate::config::Config;
use crate::output;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Create uniqueness constraints
    Init,

    /// Sync SQLite tables to Neo4j
    Sync {
        /// Write to an in-memory graph and report what would be written
        #[arg(long)]
        dry_run: bool,

        /// Records per transaction (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Show graph status
    Status {
        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the sync catalog against the relational schema
    Validate,
}

pub async fn execute(cmd: GraphCommands, config: &Config) -> Result<()> {
    match cmd {
        GraphCommands::Init => cmd_init(config).await,
        GraphCommands::Sync { dry_run, chunk_size } => {
            cmd_sync(config, dry_run, chunk_size.unwrap_or(config.sync.chunk_size)).await
        }
        GraphCommands::Status { json } => cmd_status(config, json).await,
        GraphCommands::Validate => cmd_validate(),
    }
}

async fn connect(config: &Config) -> Result<GraphClient> {
    GraphClient::connect(&config.graph)
        .await
        .with_context(|| format!("Failed to connect to Neo4j at {}", config.graph.uri))
}

async fn cmd_init(config: &Config) -> Result<()> {
    let client = connect(config).await?;
    let constraints = gcf_graph::schema::initialize_schema(&client).await?;
    println!("{} {} constraints", "Schema ready:".green().bold(), constraints);
    Ok(())
}

/// Run full sync from SQLite to Neo4j.
async fn cmd_sync(config: &Config, dry_run: bool, chunk_size: usize) -> Result<()> {
    let db = gcf_db::init_pool(&config.database.path)?;
    info!(db = %config.database.path.display(), dry_run, chunk_size, "Graph sync requested");

    if dry_run {
        println!("{}", "Dry run: syncing to an in-memory graph...".bold());
        let graph = MemoryGraph::new();
        let writer = BatchWriter::new(&graph, chunk_size)?;
        let result = gcf_graph::run_full_sync(&writer, &db).await?;
        output::print_sync_result(&result);
        output::print_graph_counts(&graph.counts().await?);
        return Ok(());
    }

    println!("{}", "Syncing to Knowledge Graph...".bold());
    let client = connect(config).await?;
    let writer = BatchWriter::new(&client, chunk_size)?.with_progress(true);
    let result = gcf_graph::run_full_sync(&writer, &db).await?;
    output::print_sync_result(&result);
    Ok(())
}

/// Show graph status (node/relationship counts).
async fn cmd_status(config: &Config, json: bool) -> Result<()> {
    let client = connect(config).await?;
    let counts = client.counts().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        output::print_graph_counts(&counts);
    }
    Ok(())
}

fn cmd_validate() -> Result<()> {
    let violations = catalog_violations(REFERENCE_SYNCS, ENTITY_SYNCS);
    if violations.is_empty() {
        println!(
            "{} {} reference and {} entity syncs",
            "Catalog valid:".green().bold(),
            REFERENCE_SYNCS.len(),
            ENTITY_SYNCS.len()
        );
        return Ok(());
    }

    for violation in &violations {
        println!("  {} {}", "✗".red(), violation);
    }
    anyhow::bail!("{} catalog violations", violations.len())
}
