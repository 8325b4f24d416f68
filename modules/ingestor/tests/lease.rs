#![allow(clippy::expect_used)]

use deptrail_module_ingestor::graph::error::Error;
use deptrail_module_ingestor::graph::lease::{Lease, LeaseConfig};
use deptrail_test_context::{pipeline, DeptrailContext};
use std::time::Duration;
use test_context::test_context;
use test_log::test;
use uuid::Uuid;

fn quick() -> LeaseConfig {
    LeaseConfig {
        ttl: Duration::from_secs(60),
        retry_interval: Duration::from_millis(10),
        max_retries: 1,
    }
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn contended_lease_times_out(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    let held = Lease::acquire(&ctx.db, project, &quick()).await?;

    let err = Lease::acquire(&ctx.db, project, &quick())
        .await
        .expect_err("the lease is taken");
    assert!(matches!(err, Error::LeaseUnavailable(p) if p == project));

    // an unrelated project is not blocked
    Lease::acquire(&ctx.db, Uuid::new_v4(), &quick())
        .await?
        .release(&ctx.db)
        .await?;

    held.release(&ctx.db).await?;
    Lease::acquire(&ctx.db, project, &quick())
        .await?
        .release(&ctx.db)
        .await?;

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn expired_lease_is_reclaimed(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    // held, but already past its TTL
    let _stale = Lease::acquire(
        &ctx.db,
        project,
        &LeaseConfig {
            ttl: Duration::ZERO,
            ..quick()
        },
    )
    .await?;

    Lease::acquire(&ctx.db, project, &quick())
        .await?
        .release(&ctx.db)
        .await?;

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn contention_surfaces_as_retryable(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    let held = Lease::acquire(&ctx.db, project, &quick()).await?;

    let err = ctx
        .ingestor
        .ingest_reports(&pipeline(project, 1), &[])
        .await
        .expect_err("the lease is taken");
    assert!(err.is_retryable());

    held.release(&ctx.db).await?;

    Ok(())
}
