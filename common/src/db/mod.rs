pub mod chunk;

use anyhow::Context;
use deptrail_migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, ExecResult, QueryResult,
    RuntimeErr, Statement,
};
use sqlx::error::ErrorKind;
use std::ops::Deref;
use tracing::instrument;
use url::Url;

#[derive(Clone, Debug)]
pub struct Database {
    db: DatabaseConnection,
}

impl Database {
    #[instrument(err)]
    pub async fn new(database: &crate::config::Database) -> Result<Self, anyhow::Error> {
        let url = database.to_url();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("connect to {}", strip_password(url.clone()));
        }

        let mut opt = ConnectOptions::new(url);
        opt.min_connections(database.min_conn);
        opt.max_connections(database.max_conn);
        opt.sqlx_logging_level(log::LevelFilter::Trace);

        let db = sea_orm::Database::connect(opt).await?;

        Ok(Self { db })
    }

    /// Connect to an explicit URL, bypassing [`crate::config::Database`].
    pub async fn connect(url: impl Into<String>) -> Result<Self, anyhow::Error> {
        let mut opt = ConnectOptions::new(url);
        opt.sqlx_logging_level(log::LevelFilter::Trace);

        let db = sea_orm::Database::connect(opt).await?;

        Ok(Self { db })
    }

    /// An in-memory SQLite instance with the schema applied.
    ///
    /// The pool is capped at a single connection: every pooled connection of
    /// an in-memory SQLite database would otherwise see its own, empty
    /// database.
    pub async fn for_test() -> Result<Self, anyhow::Error> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);
        opt.sqlx_logging_level(log::LevelFilter::Trace);

        let db = Self {
            db: sea_orm::Database::connect(opt).await?,
        };
        db.migrate().await?;

        Ok(db)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        log::debug!("applying migrations");
        Migrator::up(&self.db, None).await?;
        log::debug!("applied migrations");

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn close(self) -> anyhow::Result<()> {
        Ok(self.db.close().await?)
    }

    /// Ping the database.
    ///
    /// Intended to be used for health checks.
    #[instrument(skip(self), err)]
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db
            .ping()
            .await
            .context("failed to ping the database")?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

#[async_trait::async_trait]
impl ConnectionTrait for Database {
    fn get_database_backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.db.execute(stmt).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.db.execute_unprepared(sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.db.query_one(stmt).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.db.query_all(stmt).await
    }

    fn support_returning(&self) -> bool {
        self.db.support_returning()
    }
}

/// A trait to help working with database errors
pub trait DatabaseErrors {
    /// return `true` if the error is a duplicate key error
    fn is_duplicate(&self) -> bool;
}

impl DatabaseErrors for DbErr {
    fn is_duplicate(&self) -> bool {
        match self {
            DbErr::Query(RuntimeErr::SqlxError(sqlx::error::Error::Database(err))) => {
                err.kind() == ErrorKind::UniqueViolation
            }
            _ => false,
        }
    }
}

/// Remove the password from the URL and replace it with `***`, if present.
///
/// If this is not a URL, or does not contain a password, this is a no-op.
fn strip_password(url: String) -> String {
    match Url::parse(&url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => url,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn url_strip_password() {
        assert_eq!(
            "postgres://deptrail:***@db:5432/deptrail",
            strip_password("postgres://deptrail:secret@db:5432/deptrail".to_string())
        )
    }

    #[test]
    fn url_strip_no_password() {
        assert_eq!(
            "postgres://deptrail@db:5432/deptrail",
            strip_password("postgres://deptrail@db:5432/deptrail".to_string())
        )
    }

    #[test]
    fn url_strip_password_not_a_url() {
        assert_eq!("foo-bar-baz", strip_password("foo-bar-baz".to_string()))
    }
}
