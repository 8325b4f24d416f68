//! The batched upsert stages of the ingestion pipeline.
//!
//! Each task accepts the pipeline context and one slice of occurrence
//! maps, mutates the maps in place with newly assigned identifiers, and is
//! idempotent: re-running a slice against already-persisted state creates
//! no duplicates. An empty slice is a no-op for every task.

pub mod component_versions;
pub mod components;
pub mod occurrence_vulnerabilities;
pub mod occurrences;
pub mod source_packages;
pub mod sources;

use super::OccurrenceMap;
use crate::graph::error::Error;
use crate::model::Pipeline;
use sea_orm::ConnectionTrait;

/// Run all tasks, strictly in order: each stage fills identifiers the later
/// ones depend on. This ordering is a hard invariant, not an optimization.
pub async fn execute_all<C: ConnectionTrait>(
    db: &C,
    pipeline: &Pipeline,
    maps: &mut Vec<OccurrenceMap>,
) -> Result<(), Error> {
    components::execute(db, pipeline, maps).await?;
    component_versions::execute(db, pipeline, maps).await?;
    sources::execute(db, pipeline, maps).await?;
    source_packages::execute(db, pipeline, maps).await?;
    occurrences::execute(db, pipeline, maps).await?;
    occurrence_vulnerabilities::execute(db, pipeline, maps).await?;

    Ok(())
}
