//! Neo4j connection client.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Query};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, warn};

use gcf_db::Value;

use crate::label::Label;
use crate::store::{GraphCounts, GraphStore, Record, Statement};

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
            max_connections: 4,
        }
    }
}

/// Client for Neo4j graph operations.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// `Graph::connect` only builds the pool, so a `RETURN 1` ping follows to
    /// surface an unreachable server here rather than on the first write.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(500)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        debug!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a Cypher query that returns no results.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph.run(query).await.context("Neo4j query execution failed")?;
        Ok(())
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(query).await.context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j result")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return a single scalar value.
    pub async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> Result<Option<T>> {
        let rows = self.query(query).await?;
        if let Some(row) = rows.into_iter().next() {
            let val: T = row
                .get(field)
                .map_err(|e| anyhow::anyhow!("Failed to get field '{}': {:?}", field, e))?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    async fn count(&self, cypher: String) -> Result<usize> {
        let count: i64 = self.query_scalar(Query::new(cypher), "count").await?.unwrap_or(0);
        Ok(count as usize)
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn write(&self, statement: &Statement, records: &[Record]) -> Result<()> {
        let data: Vec<HashMap<String, BoltType>> = records.iter().map(to_bolt).collect();
        let query = Query::new(statement.cypher()).param("data", data);

        let mut txn = self.graph.start_txn().await.context("Failed to start transaction")?;
        match txn.run(query).await {
            Ok(()) => txn.commit().await.context("Failed to commit transaction"),
            Err(e) => {
                error!(statement = %statement.describe(), records = records.len(), error = %e, "Write failed, rolling back");
                let rollback = txn.rollback().await;
                Err(write_failure(statement, e, rollback))
            }
        }
    }

    async fn ensure_unique_id(&self, label: Label) -> Result<()> {
        let cypher = format!(
            "CREATE CONSTRAINT {}_id IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
            label.as_str().to_lowercase(),
            label
        );
        self.execute(Query::new(cypher))
            .await
            .with_context(|| format!("Failed to create constraint for {}", label))
    }

    async fn counts(&self) -> Result<GraphCounts> {
        let nodes = self.count("MATCH (n) RETURN count(n) AS count".to_string()).await?;
        let relationships = self.count("MATCH ()-[r]->() RETURN count(r) AS count".to_string()).await?;

        let mut by_label = Vec::with_capacity(Label::ALL.len());
        for label in Label::ALL {
            let count = self.count(format!("MATCH (n:{}) RETURN count(n) AS count", label)).await?;
            by_label.push((label, count));
        }

        Ok(GraphCounts {
            nodes,
            relationships,
            by_label,
        })
    }
}

fn to_bolt(record: &Record) -> HashMap<String, BoltType> {
    record
        .iter()
        .map(|(key, value)| (key.clone(), value_to_bolt(value)))
        .collect()
}

fn value_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Integer(i) => BoltType::from(*i),
        Value::Real(f) => BoltType::from(*f),
        Value::Text(s) => BoltType::from(s.as_str()),
        Value::Boolean(b) => BoltType::from(*b),
    }
}

/// The error reported for a failed chunk. A rollback failure is only logged
/// so the caller still sees the write error.
fn write_failure<E, R>(statement: &Statement, write: E, rollback: std::result::Result<(), R>) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Display,
{
    if let Err(rollback) = rollback {
        warn!(statement = %statement.describe(), error = %rollback, "Rollback failed");
    }
    anyhow::Error::new(write).context(format!("Failed to write {}", statement.describe()))
}
