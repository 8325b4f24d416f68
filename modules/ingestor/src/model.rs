use uuid::Uuid;

/// The CI pipeline an ingestion run works on behalf of. Provided by the
/// caller; the ingestion core never loads pipelines itself.
#[derive(Clone, Debug)]
pub struct Pipeline {
    pub id: i64,
    pub project_id: Uuid,
    pub commit_sha: String,
    pub jobs: Vec<PipelineJob>,
}

impl Pipeline {
    /// A failed job which was expected to produce an SBOM artifact poisons
    /// any absence-based conclusion: its components are simply unknown.
    pub fn has_failed_sbom_job(&self) -> bool {
        self.jobs.iter().any(|job| {
            job.status == JobStatus::Failed && job.artifacts.contains(&ArtifactType::CycloneDx)
        })
    }
}

#[derive(Clone, Debug)]
pub struct PipelineJob {
    pub name: String,
    pub status: JobStatus,
    /// Artifact types the job was configured to produce.
    pub artifacts: Vec<ArtifactType>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Created,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactType {
    CycloneDx,
    Metrics,
    Trace,
}

/// The result of one pipeline's ingestion run.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct IngestResult {
    /// All occurrences the pipeline's reports map onto, sorted.
    pub occurrence_ids: Vec<Uuid>,
    /// Vulnerabilities whose backing occurrence was pruned; handed to the
    /// vulnerability subsystem for re-synchronization.
    pub pruned_vulnerability_ids: Vec<Uuid>,
    /// Validation errors of rejected reports, for operator visibility.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}
