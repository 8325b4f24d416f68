use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::{sbom_occurrence_vulnerability, vulnerability};
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use sea_query::OnConflict;
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;
use uuid::Uuid;

/// Link the slice's occurrences to pre-existing vulnerability records of
/// the project, matched by package name and version, and fill
/// `vulnerability_ids` on each map.
#[instrument(skip_all, fields(num = maps.len()), err)]
pub async fn execute<C: ConnectionTrait>(
    db: &C,
    pipeline: &Pipeline,
    maps: &mut Vec<OccurrenceMap>,
) -> Result<(), Error> {
    if maps.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = maps
        .iter()
        .map(|map| map.component.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let known = vulnerability::Entity::find()
        .filter(vulnerability::Column::ProjectId.eq(pipeline.project_id))
        .filter(vulnerability::Column::PackageName.is_in(names))
        .all(db)
        .await?;

    if known.is_empty() {
        return Ok(());
    }

    let mut by_name: HashMap<&str, Vec<&vulnerability::Model>> = HashMap::new();
    for vulnerability in &known {
        by_name
            .entry(vulnerability.package_name.as_str())
            .or_default()
            .push(vulnerability);
    }

    let mut links = Vec::new();

    for map in maps.iter_mut() {
        let Some(occurrence_id) = map.occurrence_id else {
            continue;
        };
        let Some(candidates) = by_name.get(map.component.name.as_str()) else {
            continue;
        };

        // a vulnerability without a version applies to every version
        let mut ids: Vec<Uuid> = candidates
            .iter()
            .filter(|vulnerability| {
                match (&vulnerability.package_version, &map.component.version) {
                    (None, _) => true,
                    (Some(affected), Some(version)) => affected == version,
                    (Some(_), None) => false,
                }
            })
            .map(|vulnerability| vulnerability.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            continue;
        }

        links.extend(
            ids.iter()
                .map(|id| sbom_occurrence_vulnerability::ActiveModel {
                    occurrence_id: Set(occurrence_id),
                    vulnerability_id: Set(*id),
                }),
        );
        map.vulnerability_ids = ids;
    }

    if links.is_empty() {
        return Ok(());
    }

    for batch in &links.into_iter().chunked() {
        sbom_occurrence_vulnerability::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::columns([
                    sbom_occurrence_vulnerability::Column::OccurrenceId,
                    sbom_occurrence_vulnerability::Column::VulnerabilityId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
