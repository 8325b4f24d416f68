pub mod strategy;

mod loader;
use loader::ReportLoader;

use crate::graph::lease::{Lease, LeaseConfig};
use crate::graph::occurrence::prune::prune_stale_occurrences;
use crate::graph::Graph;
use crate::job::{Job, JobDispatcher};
use crate::model::{IngestResult, Pipeline};
use crate::report::Report;
use deptrail_common::db::Database;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] crate::graph::error::Error),
}

impl Error {
    /// Lease contention is not fatal: the job scheduler is expected to
    /// re-deliver the whole unit of work.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Graph(crate::graph::error::Error::LeaseUnavailable(_))
        )
    }
}

/// Tuning parameters of the ingestion pipeline. The batch sizes are tied
/// to the datastore's transaction and lock characteristics, so they are
/// configuration rather than constants.
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Ingestion")]
#[group(id = "ingestion")]
pub struct IngestionConfig {
    /// Number of report components ingested per slice.
    #[arg(
        id = "ingest-slice-size",
        long,
        env = "INGEST_SLICE_SIZE",
        default_value_t = 10
    )]
    pub slice_size: usize,
    /// Number of stale occurrences deleted per batch.
    #[arg(
        id = "ingest-prune-batch-size",
        long,
        env = "INGEST_PRUNE_BATCH_SIZE",
        default_value_t = 100
    )]
    pub prune_batch_size: u64,
    /// Upper bound on how long one project's ingestion lease is held.
    #[arg(
        id = "ingest-lease-ttl",
        long,
        env = "INGEST_LEASE_TTL",
        default_value = "30m",
        value_parser = humantime::parse_duration
    )]
    pub lease_ttl: Duration,
    #[arg(
        id = "ingest-lease-retry-interval",
        long,
        env = "INGEST_LEASE_RETRY_INTERVAL",
        default_value = "6s",
        value_parser = humantime::parse_duration
    )]
    pub lease_retry_interval: Duration,
    #[arg(
        id = "ingest-lease-max-retries",
        long,
        env = "INGEST_LEASE_MAX_RETRIES",
        default_value_t = 10
    )]
    pub lease_max_retries: u32,
    /// Disable asynchronous dependency-graph builds.
    #[arg(
        id = "no-graph-builds",
        long,
        env = "NO_GRAPH_BUILDS",
        default_value_t = false
    )]
    pub no_graph_builds: bool,
    /// How long a claimed dependency-graph build suppresses rebuilds of the
    /// same component set.
    #[arg(
        id = "graph-refresh-ttl",
        long,
        env = "GRAPH_REFRESH_TTL",
        default_value = "24h",
        value_parser = humantime::parse_duration
    )]
    pub graph_refresh_ttl: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            slice_size: 10,
            prune_batch_size: 100,
            lease_ttl: Duration::from_secs(30 * 60),
            lease_retry_interval: Duration::from_secs(6),
            lease_max_retries: 10,
            no_graph_builds: false,
            graph_refresh_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl IngestionConfig {
    fn lease(&self) -> LeaseConfig {
        LeaseConfig {
            ttl: self.lease_ttl,
            retry_interval: self.lease_retry_interval,
            max_retries: self.lease_max_retries,
        }
    }
}

/// The per-pipeline entry point of SBOM ingestion.
#[derive(Clone)]
pub struct IngestorService {
    graph: Graph,
    dispatcher: Arc<dyn JobDispatcher>,
    config: IngestionConfig,
}

impl IngestorService {
    pub fn new(graph: Graph, dispatcher: Arc<dyn JobDispatcher>, config: IngestionConfig) -> Self {
        Self {
            graph,
            dispatcher,
            config,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn db(&self) -> &Database {
        self.graph.db()
    }

    /// Ingest all of one pipeline's SBOM reports.
    ///
    /// Holds the project's ingestion lease for the whole run; competing
    /// pipelines wait inside [`Lease::acquire`] and eventually surface
    /// retryable contention (see [`Error::is_retryable`]) to their
    /// scheduler.
    #[instrument(
        skip(self, reports),
        fields(pipeline = pipeline.id, project = %pipeline.project_id, reports = reports.len()),
        err
    )]
    pub async fn ingest_reports(
        &self,
        pipeline: &Pipeline,
        reports: &[Report],
    ) -> Result<IngestResult, Error> {
        let lease = Lease::acquire(self.db(), pipeline.project_id, &self.config.lease()).await?;

        let result = self.ingest_under_lease(pipeline, reports).await;

        // the TTL reclaims the lease should the release fail
        if let Err(err) = lease.release(self.db()).await {
            log::warn!(
                "failed to release the ingestion lease of project {}: {err}",
                pipeline.project_id
            );
        }

        result
    }

    async fn ingest_under_lease(
        &self,
        pipeline: &Pipeline,
        reports: &[Report],
    ) -> Result<IngestResult, Error> {
        let mut errors = Vec::new();
        let mut valid = Vec::new();

        for (index, report) in reports.iter().enumerate() {
            match report.validate() {
                Ok(()) => valid.push(report),
                Err(report_errors) => {
                    for error in report_errors {
                        log::warn!("pipeline {}: report {index} rejected: {error}", pipeline.id);
                        errors.push(format!("report {index}: {error}"));
                    }
                }
            }
        }

        let strategy =
            strategy::select_strategy(valid.iter().filter_map(|report| report.source_type()));
        let loader = ReportLoader::new(&self.graph, self.dispatcher.as_ref(), &self.config);

        let mut kept = HashSet::new();
        for report in &valid {
            let outcome = loader.load(pipeline, report).await?;
            kept.extend(outcome.occurrence_ids);
        }

        // Without a single valid report nothing can be said about absent
        // dependencies, so nothing is pruned either.
        let pruned = if valid.is_empty() {
            Vec::new()
        } else {
            prune_stale_occurrences(
                self.db(),
                pipeline,
                &kept,
                strategy.considered_source_types(),
                self.config.prune_batch_size,
            )
            .await?
        };

        if !pruned.is_empty() {
            self.dispatcher.enqueue(Job::SyncVulnerabilities {
                project_id: pipeline.project_id,
                vulnerability_ids: pruned.clone(),
            });
        }

        let mut occurrence_ids: Vec<Uuid> = kept.into_iter().collect();
        occurrence_ids.sort_unstable();

        Ok(IngestResult {
            occurrence_ids,
            pruned_vulnerability_ids: pruned,
            errors,
        })
    }
}
