use crate::graph::error::Error;
use crate::report::Report;
use deptrail_entity::dependency_graph_refresh;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use sea_query::OnConflict;
use sha2::{Digest as _, Sha256};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

/// The content digest of a report: SHA-256 over its sorted, deduplicated
/// component references. Two reports with the same component set always
/// digest identically, independent of component order.
pub fn digest(report: &Report) -> String {
    let mut references: Vec<String> = report
        .components
        .iter()
        .map(|component| component.reference())
        .collect();
    references.sort_unstable();
    references.dedup();

    let mut hasher = Sha256::new();
    for reference in references {
        hasher.update(reference.as_bytes());
        hasher.update(b"\n");
    }

    hex::encode(hasher.finalize())
}

/// Claim the single-flight guard for (project, digest).
///
/// Returns `true` when this pipeline won the claim and must enqueue the
/// graph build. The conditional insert is atomic: of any number of
/// concurrent claimants exactly one observes an insert, the rest a
/// conflict.
#[instrument(skip(db), err)]
pub async fn try_claim<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    pipeline_id: i64,
    digest: &str,
    ttl: Duration,
) -> Result<bool, Error> {
    let now = OffsetDateTime::now_utc();

    // an expired guard no longer vouches for the graph; drop it first
    dependency_graph_refresh::Entity::delete_many()
        .filter(dependency_graph_refresh::Column::ProjectId.eq(project_id))
        .filter(dependency_graph_refresh::Column::Digest.eq(digest))
        .filter(dependency_graph_refresh::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;

    let model = dependency_graph_refresh::ActiveModel {
        project_id: Set(project_id),
        digest: Set(digest.to_string()),
        pipeline_id: Set(pipeline_id),
        expires_at: Set(now + ttl),
    };

    let inserted = dependency_graph_refresh::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                dependency_graph_refresh::Column::ProjectId,
                dependency_graph_refresh::Column::Digest,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(inserted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Component, Report};
    use deptrail_entity::sbom_component::ComponentType;
    use deptrail_entity::sbom_occurrence::Reachability;

    fn component(name: &str, version: &str) -> Component {
        Component {
            name: name.to_string(),
            version: Some(version.to_string()),
            component_type: ComponentType::Library,
            purl: None,
            source_package_name: None,
            ancestors: Vec::new(),
            reachability: Reachability::Unknown,
            licenses: Vec::new(),
        }
    }

    fn report(components: Vec<Component>) -> Report {
        Report {
            source: None,
            components,
        }
    }

    #[test]
    fn digest_is_order_insensitive() {
        let a = report(vec![component("a", "1.0"), component("b", "2.0")]);
        let b = report(vec![component("b", "2.0"), component("a", "1.0")]);
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn digest_ignores_duplicates() {
        let a = report(vec![component("a", "1.0"), component("a", "1.0")]);
        let b = report(vec![component("a", "1.0")]);
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn digest_changes_with_the_component_set() {
        let a = report(vec![component("a", "1.0")]);
        let b = report(vec![component("a", "1.1")]);
        assert_ne!(digest(&a), digest(&b));
    }
}
