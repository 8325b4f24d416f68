use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::sbom_component_version;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};
use sea_query::OnConflict;
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0xd2, 0x60, 0x4a, 0x7e, 0x0c, 0x93, 0x41, 0xb8, 0xb5, 0x1f, 0x3e, 0x08, 0xc6, 0x79, 0x12, 0x5d,
]);

fn version_uuid(component_id: Uuid, version: &str) -> Uuid {
    let result = Uuid::new_v5(&NAMESPACE, component_id.as_bytes());
    Uuid::new_v5(&result, version.as_bytes())
}

/// Upsert (component, version) rows and fill `component_version_id` on the
/// maps carrying a version. Requires `component_id` to be resolved.
#[instrument(skip_all, fields(num = maps.len()), err)]
pub async fn execute<C: ConnectionTrait>(
    db: &C,
    _pipeline: &Pipeline,
    maps: &mut Vec<OccurrenceMap>,
) -> Result<(), Error> {
    if maps.is_empty() {
        return Ok(());
    }

    let mut models = BTreeMap::new();

    for map in maps.iter_mut() {
        let Some(component_id) = map.component_id else {
            continue;
        };
        let Some(version) = map.component.version.clone() else {
            continue;
        };

        let id = version_uuid(component_id, &version);
        map.component_version_id = Some(id);

        models
            .entry(id)
            .or_insert_with(|| sbom_component_version::ActiveModel {
                id: Set(id),
                component_id: Set(component_id),
                version: Set(version),
            });
    }

    for batch in &models.into_values().chunked() {
        sbom_component_version::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::column(sbom_component_version::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
