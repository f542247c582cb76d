//! Static description of what gets synchronized, and how.
//!
//! Reference tables become plain nodes. Entity tables become nodes with a
//! property allow-list, one typed edge per foreign-key column, and
//! optionally edges from a join table. Column names are the camelCase forms
//! of the SQLite columns.

use std::collections::BTreeSet;

use anyhow::{bail, Result};

use gcf_db::schema::{self, TableSchema};

use crate::label::{Direction, Label, Relation};
use crate::sync::snake_to_camel;

use Direction::{In, Out};

/// A reference table mirrored as nodes, all columns as properties.
#[derive(Debug)]
pub struct NodeSync {
    pub label: Label,
    pub table: &'static TableSchema,
}

/// A foreign-key column turned into an edge.
#[derive(Debug)]
pub struct ForeignEdge {
    pub column: &'static str,
    pub target: Label,
    pub direction: Direction,
    pub relation: Relation,
}

/// Edges read from a join table: `(entity {id: owner})-[relation]->(target {id: column})`.
#[derive(Debug)]
pub struct JoinEdge {
    pub table: &'static TableSchema,
    pub owner: &'static str,
    pub column: &'static str,
    pub target: Label,
    pub relation: Relation,
}

#[derive(Debug)]
pub struct EntitySync {
    pub label: Label,
    pub table: &'static TableSchema,
    pub properties: &'static [&'static str],
    pub edges: &'static [ForeignEdge],
    pub join: Option<JoinEdge>,
}

const fn edge(column: &'static str, target: Label, direction: Direction, relation: Relation) -> ForeignEdge {
    ForeignEdge {
        column,
        target,
        direction,
        relation,
    }
}

const fn reference(label: Label, table: &'static TableSchema) -> NodeSync {
    NodeSync { label, table }
}

pub static REFERENCE_SYNCS: &[NodeSync] = &[
    reference(Label::Region, &schema::REGION_DICT),
    reference(Label::ActivityType, &schema::ACTIVITY_TYPE_DICT),
    reference(Label::Bm, &schema::BM_DICT),
    reference(Label::DeliveryPartner, &schema::DELIVERY_PARTNER_DICT),
    reference(Label::EntityType, &schema::ENTITY_TYPE_DICT),
    reference(Label::EssCategory, &schema::ESS_CATEGORY_DICT),
    reference(Label::Modality, &schema::MODALITY_DICT),
    reference(Label::Sector, &schema::SECTOR_DICT),
    reference(Label::Size, &schema::SIZE_DICT),
    reference(Label::Stage, &schema::STAGE_DICT),
    reference(Label::Status, &schema::STATUS_DICT),
    reference(Label::Theme, &schema::THEME_DICT),
];

pub static ENTITY_SYNCS: &[EntitySync] = &[
    EntitySync {
        label: Label::Country,
        table: &schema::COUNTRY_NODE,
        properties: &["id", "name", "iso2", "iso3", "code", "isSids", "isLdc"],
        edges: &[edge("regionId", Label::Region, Out, Relation::IsIn)],
        join: None,
    },
    EntitySync {
        label: Label::Entity,
        table: &schema::ENTITY,
        properties: &["id", "name", "code", "isDae"],
        edges: &[
            edge("countryId", Label::Country, Out, Relation::IsIn),
            edge("entityTypeId", Label::EntityType, Out, Relation::Has),
            edge("stageId", Label::Stage, Out, Relation::Has),
            edge("sizeId", Label::Size, Out, Relation::Has),
            edge("sectorId", Label::Sector, Out, Relation::Has),
            edge("bmId", Label::Bm, In, Relation::Covers),
        ],
        join: None,
    },
    EntitySync {
        label: Label::Project,
        table: &schema::PROJECT,
        properties: &["id", "name", "ref", "financingUsd"],
        edges: &[
            edge("modalityId", Label::Modality, Out, Relation::Has),
            edge("entityId", Label::Entity, In, Relation::Funds),
            edge("bmId", Label::Bm, In, Relation::Covers),
            edge("sectorId", Label::Sector, Out, Relation::Has),
            edge("themeId", Label::Theme, Out, Relation::Has),
            edge("sizeId", Label::Size, Out, Relation::Has),
            edge("essCategoryId", Label::EssCategory, Out, Relation::Has),
        ],
        join: Some(JoinEdge {
            table: &schema::PROJECT_COUNTRY,
            owner: "projectId",
            column: "countryId",
            target: Label::Country,
            relation: Relation::GivenTo,
        }),
    },
    EntitySync {
        label: Label::Readiness,
        table: &schema::READINESS,
        properties: &[
            "id",
            "name",
            "ref",
            "hasSids",
            "hasLdc",
            "isNap",
            "approvedDate",
            "financingUsd",
        ],
        edges: &[
            edge("activityTypeId", Label::ActivityType, Out, Relation::Has),
            edge("deliveryPartnerId", Label::DeliveryPartner, Out, Relation::DoneBy),
            edge("statusId", Label::Status, Out, Relation::Has),
            edge("regionId", Label::Region, Out, Relation::Has),
        ],
        join: Some(JoinEdge {
            table: &schema::READINESS_COUNTRY,
            owner: "readinessId",
            column: "countryId",
            target: Label::Country,
            relation: Relation::GivenTo,
        }),
    },
];

fn camel_columns(table: &TableSchema) -> BTreeSet<String> {
    table.columns.iter().map(|c| snake_to_camel(c.name)).collect()
}

/// Every inconsistency in the plan, in plan order.
pub fn catalog_violations(references: &[NodeSync], entities: &[EntitySync]) -> Vec<String> {
    let mut violations = Vec::new();
    let mut synced: BTreeSet<Label> = BTreeSet::new();

    for sync in references {
        if !synced.insert(sync.label) {
            violations.push(format!("{} is synchronized more than once", sync.label));
        }
        if sync.table.column("id").is_none() {
            violations.push(format!("{}: table {} has no id column", sync.label, sync.table.name));
        }
    }

    for sync in entities {
        let columns = camel_columns(sync.table);

        if !sync.properties.contains(&"id") {
            violations.push(format!("{}: properties must include id", sync.label));
        }
        for property in sync.properties {
            if !columns.contains(*property) {
                violations.push(format!(
                    "{}: property '{}' is not a column of {}",
                    sync.label, property, sync.table.name
                ));
            }
        }
        for edge in sync.edges {
            if !columns.contains(edge.column) {
                violations.push(format!(
                    "{}: foreign key '{}' is not a column of {}",
                    sync.label, edge.column, sync.table.name
                ));
            }
            if !synced.contains(&edge.target) {
                violations.push(format!(
                    "{}: '{}' targets {} which is not synchronized earlier",
                    sync.label, edge.column, edge.target
                ));
            }
        }
        if let Some(join) = &sync.join {
            let join_columns = camel_columns(join.table);
            for column in [join.owner, join.column] {
                if !join_columns.contains(column) {
                    violations.push(format!(
                        "{}: join column '{}' is not a column of {}",
                        sync.label, column, join.table.name
                    ));
                }
            }
            if !synced.contains(&join.target) {
                violations.push(format!(
                    "{}: join targets {} which is not synchronized earlier",
                    sync.label, join.target
                ));
            }
        }

        if !synced.insert(sync.label) {
            violations.push(format!("{} is synchronized more than once", sync.label));
        }
    }

    violations
}

/// Fail with every violation listed.
pub fn validate_catalog(references: &[NodeSync], entities: &[EntitySync]) -> Result<()> {
    let violations = catalog_violations(references, entities);
    if !violations.is_empty() {
        bail!("Invalid sync catalog:\n  {}", violations.join("\n  "));
    }
    Ok(())
}
