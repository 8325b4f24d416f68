use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::sbom_source;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};
use sea_query::OnConflict;
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x81, 0x2f, 0xe0, 0x4b, 0x66, 0x1d, 0x4c, 0x09, 0xa7, 0x52, 0xd9, 0x84, 0x30, 0xbe, 0x6f, 0x93,
]);

/// Upsert the distinct source payloads of the slice and fill `source_id`.
///
/// The id is derived from the canonical JSON payload: identical scanner
/// metadata across reports and pipelines converges on one row.
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
        let Some(source) = &map.source else {
            continue;
        };

        let payload = serde_json::to_value(source)?;
        let result = Uuid::new_v5(&NAMESPACE, source.source_type.to_string().as_bytes());
        let id = Uuid::new_v5(&result, payload.to_string().as_bytes());
        map.source_id = Some(id);

        models.entry(id).or_insert_with(|| sbom_source::ActiveModel {
            id: Set(id),
            source_type: Set(source.source_type),
            payload: Set(payload),
        });
    }

    for batch in &models.into_values().chunked() {
        sbom_source::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::column(sbom_source::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
