use super::{Error, IngestionConfig};
use crate::graph::dependency_graph;
use crate::graph::occurrence::slice::ingest_slice;
use crate::graph::occurrence::occurrence_maps;
use crate::graph::Graph;
use crate::job::{Job, JobDispatcher};
use crate::model::Pipeline;
use crate::report::Report;
use tracing::instrument;
use uuid::Uuid;

/// Drives one report through the slice pipeline and, when its component
/// set is unseen, kicks off the asynchronous dependency-graph build.
pub(crate) struct ReportLoader<'a> {
    graph: &'a Graph,
    dispatcher: &'a dyn JobDispatcher,
    config: &'a IngestionConfig,
}

#[derive(Debug, Default)]
pub(crate) struct ReportOutcome {
    pub occurrence_ids: Vec<Uuid>,
    pub source_ids: Vec<Uuid>,
}

impl<'a> ReportLoader<'a> {
    pub fn new(
        graph: &'a Graph,
        dispatcher: &'a dyn JobDispatcher,
        config: &'a IngestionConfig,
    ) -> Self {
        Self {
            graph,
            dispatcher,
            config,
        }
    }

    /// Slices are processed strictly sequentially: this bounds memory and
    /// connection usage, at the cost of latency proportional to the
    /// component count.
    #[instrument(
        skip_all,
        fields(pipeline = pipeline.id, components = report.components.len()),
        err
    )]
    pub async fn load(
        &self,
        pipeline: &Pipeline,
        report: &Report,
    ) -> Result<ReportOutcome, Error> {
        let db = self.graph.db();

        let mut remaining = occurrence_maps(report);
        let mut outcome = ReportOutcome::default();

        while !remaining.is_empty() {
            let tail = if remaining.len() > self.config.slice_size {
                remaining.split_off(self.config.slice_size)
            } else {
                Vec::new()
            };
            let mut slice = std::mem::replace(&mut remaining, tail);

            let result = ingest_slice(db, pipeline, &mut slice).await?;
            outcome.occurrence_ids.extend(result.occurrence_ids);
            outcome.source_ids.extend(result.source_ids);
        }

        outcome.source_ids.sort_unstable();
        outcome.source_ids.dedup();

        self.trigger_graph_build(pipeline, report).await?;

        Ok(outcome)
    }

    async fn trigger_graph_build(
        &self,
        pipeline: &Pipeline,
        report: &Report,
    ) -> Result<(), Error> {
        if self.config.no_graph_builds {
            return Ok(());
        }

        let digest = dependency_graph::digest(report);
        let claimed = dependency_graph::try_claim(
            self.graph.db(),
            pipeline.project_id,
            pipeline.id,
            &digest,
            self.config.graph_refresh_ttl,
        )
        .await?;

        if claimed {
            log::debug!(
                "claimed dependency graph build for project {} ({digest})",
                pipeline.project_id
            );
            self.dispatcher.enqueue(Job::BuildDependencyGraph {
                project_id: pipeline.project_id,
            });
        } else {
            log::debug!(
                "dependency graph for project {} ({digest}) is fresh or already building",
                pipeline.project_id
            );
        }

        Ok(())
    }
}
