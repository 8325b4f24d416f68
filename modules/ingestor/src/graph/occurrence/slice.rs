use super::{tasks, OccurrenceMap};
use crate::graph::error::Error;
use crate::model::Pipeline;
use sea_orm::ConnectionTrait;
use tracing::instrument;
use uuid::Uuid;

/// What one slice contributed: the occurrence rows it mapped onto and the
/// distinct sources it touched.
#[derive(Debug, Default)]
pub struct SliceOutcome {
    pub occurrence_ids: Vec<Uuid>,
    pub source_ids: Vec<Uuid>,
}

/// Run the full task pipeline over one bounded slice of occurrence maps.
///
/// Fails fast on the first task error; every task issues its own batched
/// statements and is independently idempotent, so a partially ingested
/// slice reconciles on the next run.
#[instrument(skip_all, fields(num = maps.len()), err)]
pub async fn ingest_slice<C: ConnectionTrait>(
    db: &C,
    pipeline: &Pipeline,
    maps: &mut Vec<OccurrenceMap>,
) -> Result<SliceOutcome, Error> {
    tasks::execute_all(db, pipeline, maps).await?;

    let occurrence_ids = maps.iter().filter_map(|map| map.occurrence_id).collect();

    let mut source_ids: Vec<Uuid> = maps.iter().filter_map(|map| map.source_id).collect();
    source_ids.sort_unstable();
    source_ids.dedup();

    Ok(SliceOutcome {
        occurrence_ids,
        source_ids,
    })
}
