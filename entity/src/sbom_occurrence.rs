use crate::source_type::SourceType;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One observed fact: "component X at version Y was seen via source Z in
/// project P". The primary key is derived from exactly that tuple, so
/// re-ingesting the same report maps onto the same row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_occurrence")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub pipeline_id: i64,
    pub commit_sha: String,
    pub component_id: Uuid,
    pub component_version_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub source_package_id: Option<Uuid>,
    pub component_name: String,
    pub purl_type: Option<String>,
    pub source_type: Option<SourceType>,
    pub package_manager: Option<String>,
    pub input_file_path: Option<String>,
    pub licenses: Json,
    pub ancestors: Json,
    pub reachability: Reachability,
    /// Digest over the mutable attributes; the conflict clause of the
    /// occurrence upsert uses it to skip rewriting unchanged rows.
    pub fingerprint: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sbom_component::Entity",
        from = "Column::ComponentId",
        to = "super::sbom_component::Column::Id"
    )]
    Component,
    #[sea_orm(
        belongs_to = "super::sbom_component_version::Entity",
        from = "Column::ComponentVersionId",
        to = "super::sbom_component_version::Column::Id"
    )]
    ComponentVersion,
    #[sea_orm(
        belongs_to = "super::sbom_source::Entity",
        from = "Column::SourceId",
        to = "super::sbom_source::Column::Id"
    )]
    Source,
    #[sea_orm(
        belongs_to = "super::sbom_source_package::Entity",
        from = "Column::SourcePackageId",
        to = "super::sbom_source_package::Column::Id"
    )]
    SourcePackage,
    #[sea_orm(has_many = "super::sbom_occurrence_vulnerability::Entity")]
    Vulnerability,
}

impl Related<super::sbom_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Component.def()
    }
}

impl Related<super::sbom_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl Related<super::sbom_source_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourcePackage.def()
    }
}

impl Related<super::sbom_occurrence_vulnerability::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vulnerability.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Whether static analysis found a path from the project's own code to the
/// component.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    #[default]
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "in_reach")]
    InReach,
}
