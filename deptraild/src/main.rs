use anyhow::Context;
use clap::{Parser, Subcommand};
use deptrail_common::{config, db::Database};
use deptrail_module_ingestor::graph::Graph;
use deptrail_module_ingestor::job::{Job, JobDispatcher};
use deptrail_module_ingestor::model::{ArtifactType, JobStatus, Pipeline, PipelineJob};
use deptrail_module_ingestor::report::Report;
use deptrail_module_ingestor::service::{IngestionConfig, IngestorService};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "deptraild", version, about = "SBOM occurrence ingestion worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one pipeline's SBOM reports.
    Ingest(Ingest),
    /// Apply pending database migrations.
    Migrate(Migrate),
}

#[derive(clap::Args, Debug)]
struct Migrate {
    #[command(flatten)]
    database: config::Database,
}

#[derive(clap::Args, Debug)]
struct Ingest {
    #[command(flatten)]
    database: config::Database,
    #[command(flatten)]
    ingestion: IngestionConfig,
    /// The project the reports belong to.
    #[arg(long, env = "PROJECT_ID")]
    project_id: Uuid,
    #[arg(long, env = "PIPELINE_ID")]
    pipeline_id: i64,
    #[arg(long, env = "COMMIT_SHA")]
    commit_sha: String,
    /// Mark the pipeline's SBOM job as failed, which skips stale pruning.
    #[arg(long, default_value_t = false)]
    sbom_job_failed: bool,
    /// Report documents to ingest.
    #[arg(required = true)]
    reports: Vec<PathBuf>,
}

/// Stand-in for the queue backend: jobs are logged. A deployment hooks the
/// actual worker queue in here.
struct LogDispatcher;

impl JobDispatcher for LogDispatcher {
    fn enqueue(&self, job: Job) {
        log::info!("enqueued {job:?}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Migrate(args) => migrate(args).await,
        Command::Ingest(args) => ingest(args).await,
    }
}

async fn migrate(args: Migrate) -> anyhow::Result<()> {
    let db = Database::new(&args.database).await?;
    db.migrate().await?;
    db.close().await?;

    Ok(())
}

async fn ingest(args: Ingest) -> anyhow::Result<()> {
    let db = Database::new(&args.database).await?;
    let service = IngestorService::new(
        Graph::new(db.clone()),
        Arc::new(LogDispatcher),
        args.ingestion,
    );

    let mut reports = Vec::with_capacity(args.reports.len());
    for path in &args.reports {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let report: Report = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", path.display()))?;
        reports.push(report);
    }

    let status = if args.sbom_job_failed {
        JobStatus::Failed
    } else {
        JobStatus::Success
    };
    let pipeline = Pipeline {
        id: args.pipeline_id,
        project_id: args.project_id,
        commit_sha: args.commit_sha,
        jobs: vec![PipelineJob {
            name: "sbom-scan".to_string(),
            status,
            artifacts: vec![ArtifactType::CycloneDx],
        }],
    };

    let result = service.ingest_reports(&pipeline, &reports).await?;

    for error in &result.errors {
        log::warn!("{error}");
    }
    log::info!(
        "pipeline {}: {} occurrences, {} pruned vulnerabilities",
        pipeline.id,
        result.occurrence_ids.len(),
        result.pruned_vulnerability_ids.len()
    );

    db.close().await?;

    Ok(())
}
