use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sbom_component")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub component_type: ComponentType,
    pub name: String,
    pub purl_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sbom_component_version::Entity")]
    Version,
    #[sea_orm(has_many = "super::sbom_occurrence::Entity")]
    Occurrence,
}

impl Related<super::sbom_component_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Version.def()
    }
}

impl Related<super::sbom_occurrence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Occurrence.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// CycloneDX component types observed in scan reports.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    #[default]
    #[sea_orm(string_value = "library")]
    Library,
    #[sea_orm(string_value = "application")]
    Application,
    #[sea_orm(string_value = "framework")]
    Framework,
    #[sea_orm(string_value = "container")]
    Container,
    #[sea_orm(string_value = "operating_system")]
    OperatingSystem,
    #[sea_orm(string_value = "file")]
    File,
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Application => write!(f, "application"),
            Self::Framework => write!(f, "framework"),
            Self::Container => write!(f, "container"),
            Self::OperatingSystem => write!(f, "operating_system"),
            Self::File => write!(f, "file"),
        }
    }
}
