pub mod dependency_graph;
pub mod error;
pub mod lease;
pub mod occurrence;

use deptrail_common::db::Database;

/// Access to the persisted dependency data of all projects.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) db: Database,
}

impl Graph {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.db.close().await
    }

    /// Ping the database.
    ///
    /// Intended to be used for health checks.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db.ping().await
    }
}
