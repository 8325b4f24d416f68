use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::sbom_occurrence;
use sea_orm::{ConnectionTrait, EntityTrait};
use sea_query::{Alias, Expr, OnConflict};
use std::collections::HashSet;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0xc7, 0x0d, 0x5e, 0x12, 0x9a, 0x44, 0x4b, 0xd3, 0x8f, 0x26, 0x71, 0xe5, 0x0b, 0x98, 0x3a, 0x46,
]);

/// An occurrence is the fact "(project, component, version, source)"; the
/// id derives from exactly that tuple.
fn occurrence_uuid(
    project_id: Uuid,
    component_id: Uuid,
    component_version_id: Option<Uuid>,
    source_id: Option<Uuid>,
    purl_type: Option<&str>,
) -> Uuid {
    let mut result = Uuid::new_v5(&NAMESPACE, project_id.as_bytes());
    result = Uuid::new_v5(&result, component_id.as_bytes());
    if let Some(component_version_id) = component_version_id {
        result = Uuid::new_v5(&result, component_version_id.as_bytes());
    }
    if let Some(source_id) = source_id {
        result = Uuid::new_v5(&result, source_id.as_bytes());
    }
    if let Some(purl_type) = purl_type {
        result = Uuid::new_v5(&result, purl_type.as_bytes());
    }
    result
}

/// Upsert the occurrence rows and fill `occurrence_id`.
///
/// Maps collapsing onto the same occurrence are discarded from the slice,
/// keeping the first. The conflict clause only rewrites a row whose
/// fingerprint changed: a re-run of the same report, or a run that only
/// moved pipeline attributes, leaves stored rows untouched.
#[instrument(skip_all, fields(num = maps.len()), err)]
pub async fn execute<C: ConnectionTrait>(
    db: &C,
    pipeline: &Pipeline,
    maps: &mut Vec<OccurrenceMap>,
) -> Result<(), Error> {
    if maps.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::new();
    maps.retain_mut(|map| {
        let Some(component_id) = map.component_id else {
            return false;
        };
        let id = occurrence_uuid(
            pipeline.project_id,
            component_id,
            map.component_version_id,
            map.source_id,
            map.purl_type(),
        );
        map.occurrence_id = Some(id);
        seen.insert(id)
    });

    let now = OffsetDateTime::now_utc();
    let mut models = Vec::with_capacity(maps.len());
    for map in maps.iter() {
        let (Some(id), Some(component_id)) = (map.occurrence_id, map.component_id) else {
            continue;
        };
        models.push(map.to_model(pipeline, id, component_id, now)?);
    }

    for batch in &models.into_iter().chunked() {
        sbom_occurrence::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::column(sbom_occurrence::Column::Id)
                    .update_columns([
                        sbom_occurrence::Column::PipelineId,
                        sbom_occurrence::Column::CommitSha,
                        sbom_occurrence::Column::SourcePackageId,
                        sbom_occurrence::Column::PackageManager,
                        sbom_occurrence::Column::InputFilePath,
                        sbom_occurrence::Column::Licenses,
                        sbom_occurrence::Column::Ancestors,
                        sbom_occurrence::Column::Reachability,
                        sbom_occurrence::Column::Fingerprint,
                        sbom_occurrence::Column::UpdatedAt,
                    ])
                    .action_and_where(
                        Expr::col((sbom_occurrence::Entity, sbom_occurrence::Column::Fingerprint))
                            .not_equals((Alias::new("excluded"), sbom_occurrence::Column::Fingerprint)),
                    )
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrence_uuid_is_stable() {
        let project = Uuid::new_v4();
        let component = Uuid::new_v4();
        let version = Uuid::new_v4();

        let a = occurrence_uuid(project, component, Some(version), None, Some("npm"));
        let b = occurrence_uuid(project, component, Some(version), None, Some("npm"));
        assert_eq!(a, b);
    }

    #[test]
    fn occurrence_uuid_scopes_by_project() {
        let component = Uuid::new_v4();
        let a = occurrence_uuid(Uuid::new_v4(), component, None, None, None);
        let b = occurrence_uuid(Uuid::new_v4(), component, None, None, None);
        assert_ne!(a, b);
    }
}
