use crate::graph::error::Error;
use crate::model::Pipeline;
use deptrail_entity::source_type::SourceType;
use deptrail_entity::{sbom_occurrence, sbom_occurrence_vulnerability};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

/// Delete stored occurrences of the project which the latest scans no
/// longer mention, in bounded batches, and return the vulnerability ids
/// whose backing occurrence went away.
///
/// Only occurrences of the considered source types compete; `None` covers
/// occurrences recorded without a source.
///
/// A pipeline with a failed SBOM-producing job never prunes: a missing
/// report must not be read as a removed dependency.
#[instrument(skip_all, fields(project = %pipeline.project_id, kept = kept.len()), err)]
pub async fn prune_stale_occurrences<C: ConnectionTrait>(
    db: &C,
    pipeline: &Pipeline,
    kept: &HashSet<Uuid>,
    source_types: &[Option<SourceType>],
    batch_size: u64,
) -> Result<Vec<Uuid>, Error> {
    if pipeline.has_failed_sbom_job() {
        log::warn!(
            "pipeline {} has a failed SBOM job, skipping stale occurrence pruning",
            pipeline.id
        );
        return Ok(Vec::new());
    }

    let mut scope = Condition::any();
    for source_type in source_types {
        scope = match source_type {
            Some(source_type) => scope.add(sbom_occurrence::Column::SourceType.eq(*source_type)),
            None => scope.add(sbom_occurrence::Column::SourceType.is_null()),
        };
    }

    let mut vulnerability_ids = Vec::new();

    loop {
        let batch: Vec<Uuid> = sbom_occurrence::Entity::find()
            .select_only()
            .column(sbom_occurrence::Column::Id)
            .filter(sbom_occurrence::Column::ProjectId.eq(pipeline.project_id))
            .filter(scope.clone())
            .filter(sbom_occurrence::Column::Id.is_not_in(kept.iter().copied()))
            .limit(batch_size)
            .into_tuple()
            .all(db)
            .await?;

        if batch.is_empty() {
            break;
        }

        // collect the linked vulnerabilities before the rows go away
        let linked: Vec<Uuid> = sbom_occurrence_vulnerability::Entity::find()
            .select_only()
            .column(sbom_occurrence_vulnerability::Column::VulnerabilityId)
            .filter(
                sbom_occurrence_vulnerability::Column::OccurrenceId.is_in(batch.iter().copied()),
            )
            .into_tuple()
            .all(db)
            .await?;
        vulnerability_ids.extend(linked);

        sbom_occurrence_vulnerability::Entity::delete_many()
            .filter(
                sbom_occurrence_vulnerability::Column::OccurrenceId.is_in(batch.iter().copied()),
            )
            .exec(db)
            .await?;

        sbom_occurrence::Entity::delete_many()
            .filter(sbom_occurrence::Column::Id.is_in(batch))
            .exec(db)
            .await?;
    }

    vulnerability_ids.sort_unstable();
    vulnerability_ids.dedup();

    Ok(vulnerability_ids)
}
