//! Entity table → nodes with a property allow-list, plus typed edges.
//!
//! Writes are grouped: all nodes first, then one edge stream per
//! foreign-key column, then the join-table edges.

use anyhow::Result;
use tracing::debug;

use gcf_db::{DbPool, Value};

use super::{id_of, read_records, SyncResult};
use crate::catalog::{EntitySync, ForeignEdge, JoinEdge};
use crate::executor::BatchWriter;
use crate::label::{Direction, Label};
use crate::store::{EdgePattern, Record, Statement, SOURCE_ID, TARGET_ID};

pub async fn sync_entity(writer: &BatchWriter<'_>, db: &DbPool, sync: &EntitySync) -> Result<SyncResult> {
    let rows = read_records(db, sync.table)?;
    debug!(label = %sync.label, table = sync.table.name, rows = rows.len(), "Read entity rows");

    let nodes: Vec<Record> = rows.iter().map(|row| project(row, sync.properties)).collect();
    let mut result = SyncResult {
        nodes_written: writer.run(&Statement::MergeNodes(sync.label), &nodes).await?,
        relationships_written: 0,
    };

    for edge in sync.edges {
        let (pattern, records) = foreign_edges(sync.label, edge, &rows);
        let written = writer.run(&Statement::MergeEdges(pattern), &records).await?;
        debug!(label = %sync.label, column = edge.column, relation = %edge.relation, edges = written, "Foreign-key edges written");
        result.relationships_written += written;
    }

    if let Some(join) = &sync.join {
        let join_rows = read_records(db, join.table)?;
        let (pattern, records) = join_edges(sync.label, join, &join_rows);
        let written = writer.run(&Statement::MergeEdges(pattern), &records).await?;
        debug!(label = %sync.label, table = join.table.name, edges = written, "Join edges written");
        result.relationships_written += written;
    }

    Ok(result)
}

/// Keep only the allow-listed properties.
fn project(row: &Record, properties: &[&str]) -> Record {
    properties
        .iter()
        .map(|p| (p.to_string(), row.get(*p).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn edge_record(source: i64, target: i64) -> Record {
    Record::from([
        (SOURCE_ID.to_string(), Value::Integer(source)),
        (TARGET_ID.to_string(), Value::Integer(target)),
    ])
}

/// One edge per row whose foreign key is non-null.
fn foreign_edges(label: Label, edge: &ForeignEdge, rows: &[Record]) -> (EdgePattern, Vec<Record>) {
    let pattern = match edge.direction {
        Direction::Out => EdgePattern { from: label, relation: edge.relation, to: edge.target },
        Direction::In => EdgePattern { from: edge.target, relation: edge.relation, to: label },
    };

    let records = rows
        .iter()
        .filter_map(|row| {
            let id = id_of(row, "id")?;
            let target = id_of(row, edge.column)?;
            Some(match edge.direction {
                Direction::Out => edge_record(id, target),
                Direction::In => edge_record(target, id),
            })
        })
        .collect();

    (pattern, records)
}

/// One edge per join row; rows with a NULL side are skipped.
fn join_edges(label: Label, join: &JoinEdge, rows: &[Record]) -> (EdgePattern, Vec<Record>) {
    let pattern = EdgePattern {
        from: label,
        relation: join.relation,
        to: join.target,
    };
    let records = rows
        .iter()
        .filter_map(|row| Some(edge_record(id_of(row, join.owner)?, id_of(row, join.column)?)))
        .collect();
    (pattern, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NodeSync, ENTITY_SYNCS};
    use crate::label::Relation;
    use crate::memory::{Edge, MemoryGraph};
    use crate::sync::reference_sync::sync_reference;
    use gcf_db::run_migrations;
    use gcf_db::schema::{COUNTRY_NODE, ENTITY};

    static ACME: EntitySync = EntitySync {
        label: Label::Entity,
        table: &ENTITY,
        properties: &["id", "name"],
        edges: &[ForeignEdge {
            column: "countryId",
            target: Label::Country,
            direction: Direction::Out,
            relation: Relation::IsIn,
        }],
        join: None,
    };

    fn acme_db() -> DbPool {
        let pool = DbPool::in_memory().unwrap();
        run_migrations(&pool).unwrap();
        pool.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO country_dict (id, name, iso2, iso3) VALUES (5, 'Kenya', 'KE', 'KEN');
                 INSERT INTO entity (id, code, name, country_id, is_dae) VALUES (10, 'E010', 'Acme Fund', 5, 0);",
            )?;
            Ok(())
        })
        .unwrap();
        pool
    }

    const ACME_IN_KENYA: Edge = Edge {
        from: Label::Entity,
        from_id: 10,
        relation: Relation::IsIn,
        to: Label::Country,
        to_id: 5,
    };

    async fn sync_countries(writer: &BatchWriter<'_>, db: &DbPool) {
        let countries = NodeSync { label: Label::Country, table: &COUNTRY_NODE };
        sync_reference(writer, db, &countries).await.unwrap();
    }

    #[tokio::test]
    async fn test_entity_with_existing_target_gets_edge() {
        let db = acme_db();
        let graph = MemoryGraph::new();
        let writer = BatchWriter::new(&graph, 500).unwrap();
        sync_countries(&writer, &db).await;

        let result = sync_entity(&writer, &db, &ACME).await.unwrap();
        assert_eq!(result.nodes_written, 1);
        assert_eq!(result.relationships_written, 1);

        let node = graph.node(Label::Entity, 10).unwrap();
        assert_eq!(node.len(), 2);
        assert_eq!(node["name"], Value::from("Acme Fund"));
        assert_eq!(graph.edges(), vec![ACME_IN_KENYA]);
    }

    #[tokio::test]
    async fn test_missing_target_leaves_node_without_edge() {
        let db = acme_db();
        let graph = MemoryGraph::new();
        let writer = BatchWriter::new(&graph, 500).unwrap();

        sync_entity(&writer, &db, &ACME).await.unwrap();
        assert!(graph.node(Label::Entity, 10).is_some());
        assert!(graph.edges().is_empty());
    }

    #[tokio::test]
    async fn test_edges_are_idempotent() {
        let db = acme_db();
        let graph = MemoryGraph::new();
        let writer = BatchWriter::new(&graph, 500).unwrap();
        sync_countries(&writer, &db).await;

        sync_entity(&writer, &db, &ACME).await.unwrap();
        sync_entity(&writer, &db, &ACME).await.unwrap();
        assert_eq!(graph.edges(), vec![ACME_IN_KENYA]);
        assert_eq!(graph.node_count(Label::Entity), 1);
    }

    #[test]
    fn test_incoming_edge_points_at_entity() {
        let bm_covers = ForeignEdge {
            column: "bmId",
            target: Label::Bm,
            direction: Direction::In,
            relation: Relation::Covers,
        };
        let rows = vec![
            Record::from([("id".to_string(), Value::Integer(10)), ("bmId".to_string(), Value::Integer(1))]),
            Record::from([("id".to_string(), Value::Integer(11)), ("bmId".to_string(), Value::Null)]),
        ];

        let (pattern, records) = foreign_edges(Label::Entity, &bm_covers, &rows);
        assert_eq!(pattern.from, Label::Bm);
        assert_eq!(pattern.to, Label::Entity);
        assert_eq!(records, vec![edge_record(1, 10)]);
    }

    #[test]
    fn test_join_rows_with_null_side_skipped() {
        let project = ENTITY_SYNCS.iter().find(|s| s.label == Label::Project).unwrap();
        let join = project.join.as_ref().unwrap();
        let rows = vec![
            Record::from([
                ("id".to_string(), Value::Integer(1)),
                ("projectId".to_string(), Value::Integer(1)),
                ("countryId".to_string(), Value::Integer(5)),
            ]),
            Record::from([
                ("id".to_string(), Value::Integer(2)),
                ("projectId".to_string(), Value::Integer(1)),
                ("countryId".to_string(), Value::Null),
            ]),
        ];

        let (pattern, records) = join_edges(Label::Project, join, &rows);
        assert_eq!(pattern.relation, Relation::GivenTo);
        assert_eq!(records, vec![edge_record(1, 5)]);
    }
}
