use uuid::Uuid;

/// Asynchronous work handed off to the worker queue. The ingestion core
/// fires these and never waits for their completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Job {
    BuildDependencyGraph {
        project_id: Uuid,
    },
    /// Re-synchronize vulnerability state after the backing occurrences of
    /// these vulnerabilities were pruned.
    SyncVulnerabilities {
        project_id: Uuid,
        vulnerability_ids: Vec<Uuid>,
    },
}

/// The seam towards the queue backend.
pub trait JobDispatcher: Send + Sync {
    fn enqueue(&self, job: Job);
}
