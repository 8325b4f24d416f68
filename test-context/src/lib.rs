#![allow(clippy::expect_used)]

//! Shared scaffolding for integration tests: an in-memory database with the
//! schema applied, a wired-up ingestion service, a recording job dispatcher
//! and builders for the common fixtures.

use deptrail_common::db::Database;
use deptrail_entity::source_type::SourceType;
use deptrail_entity::vulnerability::{self, Severity};
use deptrail_module_ingestor::graph::Graph;
use deptrail_module_ingestor::job::{Job, JobDispatcher};
use deptrail_module_ingestor::model::{ArtifactType, JobStatus, Pipeline, PipelineJob};
use deptrail_module_ingestor::report::{Component, Report, Source};
use deptrail_module_ingestor::service::{IngestionConfig, IngestorService};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_context::AsyncTestContext;
use uuid::Uuid;

pub struct DeptrailContext {
    pub db: Database,
    pub graph: Graph,
    pub ingestor: IngestorService,
    pub jobs: Arc<RecordingDispatcher>,
}

impl DeptrailContext {
    /// A service over the same database and dispatcher with different
    /// tuning, for tests poking at batch sizes or the lease.
    pub fn service_with(&self, config: IngestionConfig) -> IngestorService {
        IngestorService::new(self.graph.clone(), self.jobs.clone(), config)
    }
}

impl AsyncTestContext for DeptrailContext {
    async fn setup() -> DeptrailContext {
        let db = Database::for_test()
            .await
            .expect("creating the test database");
        let graph = Graph::new(db.clone());
        let jobs = Arc::new(RecordingDispatcher::default());
        let ingestor = IngestorService::new(graph.clone(), jobs.clone(), test_config());

        DeptrailContext {
            db,
            graph,
            ingestor,
            jobs,
        }
    }
}

/// The default tuning with the lease retry shrunk, keeping contention tests
/// fast.
pub fn test_config() -> IngestionConfig {
    IngestionConfig {
        lease_retry_interval: Duration::from_millis(10),
        lease_max_retries: 2,
        ..Default::default()
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingDispatcher {
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().expect("dispatcher lock").clone()
    }

    pub fn graph_builds(&self) -> usize {
        self.jobs()
            .iter()
            .filter(|job| matches!(job, Job::BuildDependencyGraph { .. }))
            .count()
    }

    pub fn sync_jobs(&self) -> Vec<Job> {
        self.jobs()
            .into_iter()
            .filter(|job| matches!(job, Job::SyncVulnerabilities { .. }))
            .collect()
    }
}

impl JobDispatcher for RecordingDispatcher {
    fn enqueue(&self, job: Job) {
        self.jobs.lock().expect("dispatcher lock").push(job);
    }
}

pub fn pipeline(project_id: Uuid, id: i64) -> Pipeline {
    Pipeline {
        id,
        project_id,
        commit_sha: format!("{id:040x}"),
        jobs: vec![PipelineJob {
            name: "cyclonedx-scan".to_string(),
            status: JobStatus::Success,
            artifacts: vec![ArtifactType::CycloneDx],
        }],
    }
}

pub fn pipeline_with_failed_sbom_job(project_id: Uuid, id: i64) -> Pipeline {
    let mut pipeline = pipeline(project_id, id);
    pipeline.jobs[0].status = JobStatus::Failed;
    pipeline
}

pub fn component(name: &str, version: &str, purl_type: &str) -> Component {
    Component {
        name: name.to_string(),
        version: Some(version.to_string()),
        component_type: Default::default(),
        purl: Some(
            format!("pkg:{purl_type}/{name}@{version}")
                .parse()
                .expect("a purl"),
        ),
        source_package_name: None,
        ancestors: Vec::new(),
        reachability: Default::default(),
        licenses: Vec::new(),
    }
}

pub fn dependency_scanning_source() -> Source {
    Source {
        source_type: SourceType::DependencyScanning,
        packager: Some("npm".to_string()),
        input_file_path: Some("package-lock.json".to_string()),
        image_name: None,
        image_tag: None,
        operating_system: None,
    }
}

pub fn container_scanning_source(image_name: &str, image_tag: &str) -> Source {
    Source {
        source_type: SourceType::ContainerScanning,
        packager: Some("apk".to_string()),
        input_file_path: None,
        image_name: Some(image_name.to_string()),
        image_tag: Some(image_tag.to_string()),
        operating_system: Some("Alpine".to_string()),
    }
}

pub fn registry_scanning_source(image_name: &str, image_tag: &str) -> Source {
    Source {
        source_type: SourceType::ContainerScanningForRegistry,
        ..container_scanning_source(image_name, image_tag)
    }
}

pub fn report(source: Option<Source>, components: Vec<Component>) -> Report {
    Report { source, components }
}

pub async fn seed_vulnerability(
    db: &Database,
    project_id: Uuid,
    package_name: &str,
    package_version: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();

    vulnerability::Entity::insert(vulnerability::ActiveModel {
        id: Set(id),
        project_id: Set(project_id),
        package_name: Set(package_name.to_string()),
        package_version: Set(package_version.map(ToString::to_string)),
        severity: Set(Severity::High),
    })
    .exec_without_returning(db)
    .await?;

    Ok(id)
}

/// The component names of all stored occurrences of the project, sorted.
pub async fn stored_component_names(
    db: &Database,
    project_id: Uuid,
) -> anyhow::Result<Vec<String>> {
    use deptrail_entity::sbom_occurrence;

    let mut names: Vec<String> = sbom_occurrence::Entity::find()
        .select_only()
        .column(sbom_occurrence::Column::ComponentName)
        .filter(sbom_occurrence::Column::ProjectId.eq(project_id))
        .into_tuple()
        .all(db)
        .await?;
    names.sort();

    Ok(names)
}
