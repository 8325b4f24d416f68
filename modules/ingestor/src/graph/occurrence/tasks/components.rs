use crate::graph::error::Error;
use crate::graph::occurrence::OccurrenceMap;
use crate::model::Pipeline;
use deptrail_common::db::chunk::EntityChunkedIter;
use deptrail_entity::sbom_component::{self, ComponentType};
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};
use sea_query::OnConflict;
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x4f, 0x11, 0x9b, 0x02, 0x3d, 0xe6, 0x45, 0x2a, 0x8c, 0x30, 0x5b, 0xc7, 0x91, 0x6a, 0xd0, 0x24,
]);

fn component_uuid(component_type: ComponentType, name: &str, purl_type: Option<&str>) -> Uuid {
    let mut result = Uuid::new_v5(&NAMESPACE, component_type.to_string().as_bytes());
    result = Uuid::new_v5(&result, name.as_bytes());
    if let Some(purl_type) = purl_type {
        result = Uuid::new_v5(&result, purl_type.as_bytes());
    }
    result
}

/// Upsert the component identity rows and fill `component_id` on every map.
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
        let component = &map.component;
        let id = component_uuid(
            component.component_type,
            &component.name,
            component.purl_type(),
        );
        map.component_id = Some(id);

        models
            .entry(id)
            .or_insert_with(|| sbom_component::ActiveModel {
                id: Set(id),
                component_type: Set(component.component_type),
                name: Set(component.name.clone()),
                purl_type: Set(component.purl_type().map(ToString::to_string)),
            });
    }

    for batch in &models.into_values().chunked() {
        sbom_component::Entity::insert_many(batch)
            .on_conflict(
                OnConflict::column(sbom_component::Column::Id)
                    .do_nothing()
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
    fn component_uuid_is_stable() {
        let a = component_uuid(ComponentType::Library, "lodash", Some("npm"));
        let b = component_uuid(ComponentType::Library, "lodash", Some("npm"));
        assert_eq!(a, b);
    }

    #[test]
    fn component_uuid_discriminates() {
        let base = component_uuid(ComponentType::Library, "lodash", Some("npm"));
        assert_ne!(
            base,
            component_uuid(ComponentType::Library, "lodash", Some("gem"))
        );
        assert_ne!(
            base,
            component_uuid(ComponentType::Library, "lodash", None)
        );
        assert_ne!(
            base,
            component_uuid(ComponentType::Application, "lodash", Some("npm"))
        );
    }
}
