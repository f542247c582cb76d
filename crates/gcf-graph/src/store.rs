//! The two write shapes the synchronizers need, and the store seam.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use gcf_db::Value;

use crate::label::{Label, Relation};

/// One parameter record: property name → value.
pub type Record = BTreeMap<String, Value>;

/// Endpoint key fields carried by edge records.
pub const SOURCE_ID: &str = "sourceId";
pub const TARGET_ID: &str = "targetId";

/// `(from {id: sourceId})-[relation]->(to {id: targetId})`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgePattern {
    pub from: Label,
    pub relation: Relation,
    pub to: Label,
}

/// A write applied to every record of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    /// Merge one node per record keyed on `id`, setting properties on create only.
    MergeNodes(Label),
    /// Merge one edge per record between two existing nodes.
    MergeEdges(EdgePattern),
}

impl Statement {
    pub fn cypher(&self) -> String {
        match self {
            Statement::MergeNodes(label) => format!(
                "UNWIND $data AS record \
                 MERGE (node:{} {{id: record.id}}) \
                 ON CREATE SET node += record",
                label
            ),
            Statement::MergeEdges(edge) => format!(
                "UNWIND $data AS record \
                 MATCH (source:{} {{id: record.{}}}) \
                 MATCH (target:{} {{id: record.{}}}) \
                 MERGE (source)-[:{}]->(target)",
                edge.from, SOURCE_ID, edge.to, TARGET_ID, edge.relation
            ),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Statement::MergeNodes(label) => format!("(:{})", label),
            Statement::MergeEdges(edge) => {
                format!("(:{})-[:{}]->(:{})", edge.from, edge.relation, edge.to)
            }
        }
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
    pub by_label: Vec<(Label, usize)>,
}

/// A graph database the synchronizers can write to.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply `statement` to all `records` as one transaction.
    async fn write(&self, statement: &Statement, records: &[Record]) -> Result<()>;

    /// Create the `id` uniqueness constraint for `label` if missing.
    async fn ensure_unique_id(&self, label: Label) -> Result<()>;

    async fn counts(&self) -> Result<GraphCounts>;
}
