use crate::graph::error::Error;
use deptrail_entity::ingestion_lease;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use sea_query::OnConflict;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct LeaseConfig {
    /// Upper bound on how long one run may hold the lease; covers the worst
    /// observed job duration.
    pub ttl: Duration,
    pub retry_interval: Duration,
    pub max_retries: u32,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            retry_interval: Duration::from_secs(6),
            max_retries: 10,
        }
    }
}

/// The exclusive, TTL-bound ingestion lease of one project.
///
/// At most one ingestion run proceeds per project at any instant, across
/// all pipelines. Acquisition waits: a pipeline's ingestion job
/// legitimately queues up behind the previous one. Once the retry budget
/// is exhausted the error surfaces to the job scheduler, which re-delivers
/// the whole unit of work later.
#[derive(Debug)]
pub struct Lease {
    project_id: Uuid,
    holder: Uuid,
}

impl Lease {
    #[instrument(skip(db, config), err)]
    pub async fn acquire<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        config: &LeaseConfig,
    ) -> Result<Self, Error> {
        let holder = Uuid::new_v4();

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(config.retry_interval).await;
            }

            let now = OffsetDateTime::now_utc();

            // a dead holder's lease is reclaimable once its TTL has passed
            ingestion_lease::Entity::delete_many()
                .filter(ingestion_lease::Column::ProjectId.eq(project_id))
                .filter(ingestion_lease::Column::ExpiresAt.lte(now))
                .exec(db)
                .await?;

            let model = ingestion_lease::ActiveModel {
                project_id: Set(project_id),
                holder: Set(holder),
                expires_at: Set(now + config.ttl),
            };

            let inserted = ingestion_lease::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(ingestion_lease::Column::ProjectId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await?;

            if inserted > 0 {
                log::debug!("acquired ingestion lease for project {project_id}");
                return Ok(Self { project_id, holder });
            }

            log::debug!("ingestion lease for project {project_id} is taken, retrying");
        }

        Err(Error::LeaseUnavailable(project_id))
    }

    /// Give the lease back.
    ///
    /// Only deletes the row while this holder still owns it; a crashed run
    /// never calls this and its lease falls to the TTL instead.
    pub async fn release<C: ConnectionTrait>(self, db: &C) -> Result<(), Error> {
        ingestion_lease::Entity::delete_many()
            .filter(ingestion_lease::Column::ProjectId.eq(self.project_id))
            .filter(ingestion_lease::Column::Holder.eq(self.holder))
            .exec(db)
            .await?;

        Ok(())
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }
}
