//! Closed sets of node labels and relationship types.
//!
//! Only these names are ever interpolated into Cypher text; everything else
//! travels as query parameters.

use std::fmt;

use serde::Serialize;

/// Node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Label {
    Region,
    Country,
    ActivityType,
    Bm,
    DeliveryPartner,
    EntityType,
    EssCategory,
    Modality,
    Sector,
    Size,
    Stage,
    Status,
    Theme,
    Entity,
    Project,
    Readiness,
}

impl Label {
    pub const ALL: [Label; 16] = [
        Label::Region,
        Label::Country,
        Label::ActivityType,
        Label::Bm,
        Label::DeliveryPartner,
        Label::EntityType,
        Label::EssCategory,
        Label::Modality,
        Label::Sector,
        Label::Size,
        Label::Stage,
        Label::Status,
        Label::Theme,
        Label::Entity,
        Label::Project,
        Label::Readiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Region => "Region",
            Label::Country => "Country",
            Label::ActivityType => "ActivityType",
            Label::Bm => "Bm",
            Label::DeliveryPartner => "DeliveryPartner",
            Label::EntityType => "EntityType",
            Label::EssCategory => "EssCategory",
            Label::Modality => "Modality",
            Label::Sector => "Sector",
            Label::Size => "Size",
            Label::Stage => "Stage",
            Label::Status => "Status",
            Label::Theme => "Theme",
            Label::Entity => "Entity",
            Label::Project => "Project",
            Label::Readiness => "Readiness",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Relation {
    IsIn,
    Has,
    Covers,
    Funds,
    DoneBy,
    GivenTo,
}

impl Relation {
    pub const ALL: [Relation; 6] = [
        Relation::IsIn,
        Relation::Has,
        Relation::Covers,
        Relation::Funds,
        Relation::DoneBy,
        Relation::GivenTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::IsIn => "IS_IN",
            Relation::Has => "HAS",
            Relation::Covers => "COVERS",
            Relation::Funds => "FUNDS",
            Relation::DoneBy => "DONE_BY",
            Relation::GivenTo => "GIVEN_TO",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge direction relative to the entity being synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// entity → target
    Out,
    /// target → entity
    In,
}
