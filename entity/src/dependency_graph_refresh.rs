use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Single-flight guard for dependency-graph builds.
///
/// A non-expired row for (project, digest) means a build for exactly that
/// component set is either done or already in flight; the row records which
/// pipeline claimed it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dependency_graph_refresh")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: Uuid,
    /// Hex SHA-256 over the sorted component references of the report.
    #[sea_orm(primary_key, auto_increment = false)]
    pub digest: String,
    pub pipeline_id: i64,
    pub expires_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
