//! In-process graph with MERGE semantics, for dry runs and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::label::{Label, Relation};
use crate::store::{GraphCounts, GraphStore, Record, Statement, SOURCE_ID, TARGET_ID};

/// A stored edge: `(from, from_id) -[relation]-> (to, to_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub from: Label,
    pub from_id: i64,
    pub relation: Relation,
    pub to: Label,
    pub to_id: i64,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<(Label, i64), Record>,
    edges: BTreeSet<Edge>,
    constraints: BTreeSet<Label>,
    writes: usize,
}

/// Graph held in memory. Writes can be made to fail for testing.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
    fail_on_write: Option<usize>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th write call (1-based) fail without applying anything.
    pub fn failing_on_write(n: usize) -> Self {
        Self {
            state: Mutex::default(),
            fail_on_write: Some(n),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| anyhow!("memory graph lock poisoned"))
    }

    pub fn node(&self, label: Label, id: i64) -> Option<Record> {
        self.lock().ok()?.nodes.get(&(label, id)).cloned()
    }

    pub fn node_count(&self, label: Label) -> usize {
        self.lock()
            .map(|s| s.nodes.keys().filter(|(l, _)| *l == label).count())
            .unwrap_or(0)
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.lock().map(|s| s.edges.iter().copied().collect()).unwrap_or_default()
    }

    pub fn has_edge(&self, edge: Edge) -> bool {
        self.lock().map(|s| s.edges.contains(&edge)).unwrap_or(false)
    }

    pub fn constraints(&self) -> Vec<Label> {
        self.lock().map(|s| s.constraints.iter().copied().collect()).unwrap_or_default()
    }

    /// Number of write calls received, including failed ones.
    pub fn write_count(&self) -> usize {
        self.lock().map(|s| s.writes).unwrap_or(0)
    }
}

fn id_field(record: &Record, field: &str) -> Result<i64> {
    record
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| anyhow!("record has no integer '{}'", field))
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn write(&self, statement: &Statement, records: &[Record]) -> Result<()> {
        let mut state = self.lock()?;
        state.writes += 1;
        if self.fail_on_write == Some(state.writes) {
            bail!("injected failure on write {}", state.writes);
        }

        match statement {
            Statement::MergeNodes(label) => {
                let keyed = records
                    .iter()
                    .map(|r| -> Result<_> { Ok(((*label, id_field(r, "id")?), r)) })
                    .collect::<Result<Vec<_>>>()?;
                for (key, record) in keyed {
                    state.nodes.entry(key).or_insert_with(|| {
                        record
                            .iter()
                            .filter(|(_, v)| !v.is_null())
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    });
                }
            }
            Statement::MergeEdges(pattern) => {
                let mut edges = Vec::with_capacity(records.len());
                for record in records {
                    edges.push(Edge {
                        from: pattern.from,
                        from_id: id_field(record, SOURCE_ID)?,
                        relation: pattern.relation,
                        to: pattern.to,
                        to_id: id_field(record, TARGET_ID)?,
                    });
                }
                for edge in edges {
                    let matched = state.nodes.contains_key(&(edge.from, edge.from_id))
                        && state.nodes.contains_key(&(edge.to, edge.to_id));
                    if matched {
                        state.edges.insert(edge);
                    }
                }
            }
        }
        Ok(())
    }

    async fn ensure_unique_id(&self, label: Label) -> Result<()> {
        self.lock()?.constraints.insert(label);
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts> {
        let state = self.lock()?;
        let by_label = Label::ALL
            .iter()
            .map(|label| (*label, state.nodes.keys().filter(|(l, _)| l == label).count()))
            .collect();
        Ok(GraphCounts {
            nodes: state.nodes.len(),
            relationships: state.edges.len(),
            by_label,
        })
    }
}
