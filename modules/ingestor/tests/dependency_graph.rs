#![allow(clippy::expect_used)]

use deptrail_module_ingestor::graph::dependency_graph::{digest, try_claim};
use deptrail_module_ingestor::service::IngestionConfig;
use deptrail_test_context::{
    component, dependency_scanning_source, pipeline, report, test_config, DeptrailContext,
};
use std::time::Duration;
use test_context::test_context;
use test_log::test;
use uuid::Uuid;

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn identical_component_set_builds_once(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let report = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
    );

    ctx.ingestor
        .ingest_reports(&pipeline(project, 1), &[report.clone()])
        .await?;
    ctx.ingestor
        .ingest_reports(&pipeline(project, 2), &[report])
        .await?;

    assert_eq!(ctx.jobs.graph_builds(), 1);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn changed_component_set_builds_again(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm")],
            )],
        )
        .await?;
    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 2),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(ctx.jobs.graph_builds(), 2);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn expired_claim_is_reclaimed(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let content = digest(&report(None, vec![component("a", "1.0", "npm")]));

    // a claim with no lifetime expires instantly
    assert!(try_claim(&ctx.db, project, 1, &content, Duration::ZERO).await?);
    assert!(try_claim(&ctx.db, project, 2, &content, Duration::from_secs(24 * 60 * 60)).await?);
    assert!(!try_claim(&ctx.db, project, 3, &content, Duration::from_secs(24 * 60 * 60)).await?);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn claims_are_scoped_by_project(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let content = digest(&report(None, vec![component("a", "1.0", "npm")]));
    let ttl = Duration::from_secs(60);

    assert!(try_claim(&ctx.db, Uuid::new_v4(), 1, &content, ttl).await?);
    assert!(try_claim(&ctx.db, Uuid::new_v4(), 2, &content, ttl).await?);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn disabled_graph_builds_enqueue_nothing(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let service = ctx.service_with(IngestionConfig {
        no_graph_builds: true,
        ..test_config()
    });

    service
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(ctx.jobs.graph_builds(), 0);

    Ok(())
}
