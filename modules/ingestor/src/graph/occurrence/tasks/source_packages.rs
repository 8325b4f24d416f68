use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::sbom_source_package;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};
use sea_query::OnConflict;
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x39, 0xc5, 0x27, 0x90, 0xf4, 0x3a, 0x4d, 0x67, 0x85, 0xee, 0x10, 0x4b, 0xaa, 0x07, 0xd8, 0x3c,
]);

fn source_package_uuid(name: &str, purl_type: Option<&str>) -> Uuid {
    let result = Uuid::new_v5(&NAMESPACE, name.as_bytes());
    match purl_type {
        Some(purl_type) => Uuid::new_v5(&result, purl_type.as_bytes()),
        None => result,
    }
}

/// Upsert source package rows for components reporting one (distribution
/// scans: the package a binary was built from) and fill
/// `source_package_id`.
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
        let Some(name) = map.component.source_package_name.clone() else {
            continue;
        };

        let id = source_package_uuid(&name, map.purl_type());
        map.source_package_id = Some(id);

        models
            .entry(id)
            .or_insert_with(|| sbom_source_package::ActiveModel {
                id: Set(id),
                name: Set(name),
                purl_type: Set(map.component.purl_type().map(ToString::to_string)),
            });
    }

    for batch in &models.into_values().chunked() {
        sbom_source_package::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::column(sbom_source_package::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
