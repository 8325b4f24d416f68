#![allow(clippy::expect_used)]

use deptrail_module_ingestor::job::Job;
use deptrail_module_ingestor::service::IngestionConfig;
use deptrail_test_context::{
    component, dependency_scanning_source, pipeline, pipeline_with_failed_sbom_job,
    registry_scanning_source, report, seed_vulnerability, stored_component_names, test_config,
    DeptrailContext,
};
use test_context::test_context;
use test_log::test;
use uuid::Uuid;

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn prunes_dropped_components(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let vulnerability = seed_vulnerability(&ctx.db, project, "b", Some("2.0")).await?;

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
            )],
        )
        .await?;
    assert_eq!(
        stored_component_names(&ctx.db, project).await?,
        vec!["a", "b"]
    );

    // the next scan drops b and picks up c
    let result = ctx
        .ingestor
        .ingest_reports(
            &pipeline(project, 2),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("c", "3.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(
        stored_component_names(&ctx.db, project).await?,
        vec!["a", "c"]
    );
    assert_eq!(result.pruned_vulnerability_ids, vec![vulnerability]);
    assert_eq!(
        ctx.jobs.sync_jobs(),
        vec![Job::SyncVulnerabilities {
            project_id: project,
            vulnerability_ids: vec![vulnerability],
        }]
    );

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn pruning_without_linked_vulnerabilities_reports_none(
    ctx: &DeptrailContext,
) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
            )],
        )
        .await?;

    let result = ctx
        .ingestor
        .ingest_reports(
            &pipeline(project, 2),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(stored_component_names(&ctx.db, project).await?, vec!["a"]);
    assert!(result.pruned_vulnerability_ids.is_empty());
    assert!(ctx.jobs.sync_jobs().is_empty());

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn failed_sbom_job_skips_pruning(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
            )],
        )
        .await?;

    // a failed scan says nothing about b's absence
    let result = ctx
        .ingestor
        .ingest_reports(
            &pipeline_with_failed_sbom_job(project, 2),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(
        stored_component_names(&ctx.db, project).await?,
        vec!["a", "b"]
    );
    assert!(result.pruned_vulnerability_ids.is_empty());

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn registry_scans_do_not_prune_source_scans(
    ctx: &DeptrailContext,
) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
            )],
        )
        .await?;

    ctx.ingestor
        .ingest_reports(
            &pipeline(project, 2),
            &[report(
                Some(registry_scanning_source("registry.example.com/app", "latest")),
                vec![component("musl", "1.2.2-r3", "apk")],
            )],
        )
        .await?;

    assert_eq!(
        stored_component_names(&ctx.db, project).await?,
        vec!["a", "b", "musl"]
    );

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn prunes_in_bounded_batches(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let service = ctx.service_with(IngestionConfig {
        prune_batch_size: 1,
        ..test_config()
    });

    service
        .ingest_reports(
            &pipeline(project, 1),
            &[report(
                Some(dependency_scanning_source()),
                vec![
                    component("a", "1.0", "npm"),
                    component("b", "2.0", "npm"),
                    component("c", "3.0", "npm"),
                ],
            )],
        )
        .await?;

    service
        .ingest_reports(
            &pipeline(project, 2),
            &[report(
                Some(dependency_scanning_source()),
                vec![component("a", "1.0", "npm")],
            )],
        )
        .await?;

    assert_eq!(stored_component_names(&ctx.db, project).await?, vec!["a"]);

    Ok(())
}
