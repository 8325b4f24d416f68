use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The kind of scanner a report (and the occurrences derived from it)
/// originates from.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[sea_orm(string_value = "dependency_scanning")]
    DependencyScanning,
    #[sea_orm(string_value = "container_scanning")]
    ContainerScanning,
    #[sea_orm(string_value = "container_scanning_for_registry")]
    ContainerScanningForRegistry,
}

impl SourceType {
    pub fn is_container_scanning(&self) -> bool {
        matches!(
            self,
            Self::ContainerScanning | Self::ContainerScanningForRegistry
        )
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DependencyScanning => write!(f, "dependency_scanning"),
            Self::ContainerScanning => write!(f, "container_scanning"),
            Self::ContainerScanningForRegistry => write!(f, "container_scanning_for_registry"),
        }
    }
}
