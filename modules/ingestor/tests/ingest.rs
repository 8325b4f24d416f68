#![allow(clippy::expect_used)]

use deptrail_entity::sbom_occurrence::{self, Reachability};
use deptrail_entity::sbom_occurrence_vulnerability;
use deptrail_entity::source_type::SourceType;
use deptrail_module_ingestor::graph::occurrence::slice::ingest_slice;
use deptrail_module_ingestor::graph::occurrence::{occurrence_maps, tasks};
use deptrail_test_context::{
    component, container_scanning_source, dependency_scanning_source, pipeline, report,
    seed_vulnerability, stored_component_names, DeptrailContext,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use test_context::test_context;
use test_log::test;
use uuid::Uuid;

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn ingest_fresh_report(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let pipeline = pipeline(project, 1);
    let report = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
    );

    let result = ctx.ingestor.ingest_reports(&pipeline, &[report]).await?;

    assert_eq!(result.occurrence_ids.len(), 2);
    assert!(result.pruned_vulnerability_ids.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(
        stored_component_names(&ctx.db, project).await?,
        vec!["a", "b"]
    );
    assert_eq!(ctx.jobs.graph_builds(), 1);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn reingest_is_idempotent(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let report = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
    );

    let first = ctx
        .ingestor
        .ingest_reports(&pipeline(project, 1), &[report.clone()])
        .await?;
    let before = sbom_occurrence::Entity::find()
        .order_by_asc(sbom_occurrence::Column::Id)
        .all(&ctx.db)
        .await?;

    // the same report through a later pipeline maps onto the same rows and
    // rewrites none of them
    let second = ctx
        .ingestor
        .ingest_reports(&pipeline(project, 2), &[report])
        .await?;
    let after = sbom_occurrence::Entity::find()
        .order_by_asc(sbom_occurrence::Column::Id)
        .all(&ctx.db)
        .await?;

    assert_eq!(first.occurrence_ids, second.occurrence_ids);
    assert_eq!(before, after);
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|occurrence| occurrence.pipeline_id == 1));

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn content_change_updates_the_row(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();

    let original = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm")],
    );
    ctx.ingestor
        .ingest_reports(&pipeline(project, 1), &[original])
        .await?;

    let mut reachable = component("a", "1.0", "npm");
    reachable.reachability = Reachability::InReach;
    let updated = report(Some(dependency_scanning_source()), vec![reachable]);
    ctx.ingestor
        .ingest_reports(&pipeline(project, 2), &[updated])
        .await?;

    let occurrences = sbom_occurrence::Entity::find().all(&ctx.db).await?;
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].reachability, Reachability::InReach);
    assert_eq!(occurrences[0].pipeline_id, 2);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn duplicate_components_collapse(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let report = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm"), component("a", "1.0", "npm")],
    );

    let result = ctx
        .ingestor
        .ingest_reports(&pipeline(project, 1), &[report])
        .await?;

    assert_eq!(result.occurrence_ids.len(), 1);
    assert_eq!(stored_component_names(&ctx.db, project).await?, vec!["a"]);

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn container_image_occurrence_attributes(
    ctx: &DeptrailContext,
) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let report = report(
        Some(container_scanning_source("docker.io/library/alpine", "3.12")),
        vec![component("alpine-baselayout", "3.2.0-r7", "apk")],
    );

    ctx.ingestor
        .ingest_reports(&pipeline(project, 1), &[report])
        .await?;

    let occurrence = sbom_occurrence::Entity::find()
        .filter(sbom_occurrence::Column::ProjectId.eq(project))
        .one(&ctx.db)
        .await?
        .expect("an occurrence");

    assert_eq!(
        occurrence.input_file_path.as_deref(),
        Some("container-image:docker.io/library/alpine:3.12")
    );
    assert_eq!(occurrence.source_type, Some(SourceType::ContainerScanning));
    assert_eq!(occurrence.package_manager.as_deref(), Some("apk"));
    assert_eq!(occurrence.purl_type.as_deref(), Some("apk"));
    assert!(occurrence.source_id.is_some());
    assert!(occurrence.component_version_id.is_some());

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn components_resolve_before_versions(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let pipeline = pipeline(project, 1);
    let report = report(
        Some(dependency_scanning_source()),
        vec![component("a", "1.0", "npm"), component("b", "2.0", "npm")],
    );
    let mut maps = occurrence_maps(&report);

    tasks::components::execute(&ctx.db, &pipeline, &mut maps).await?;
    assert!(maps.iter().all(|map| map.component_id.is_some()));

    tasks::component_versions::execute(&ctx.db, &pipeline, &mut maps).await?;
    assert!(maps.iter().all(|map| map.component_version_id.is_some()));

    Ok(())
}

#[test_context(DeptrailContext)]
#[test(tokio::test)]
async fn links_existing_vulnerabilities(ctx: &DeptrailContext) -> Result<(), anyhow::Error> {
    let project = Uuid::new_v4();
    let pipeline = pipeline(project, 1);
    let vulnerability =
        seed_vulnerability(&ctx.db, project, "lodash", Some("1.0.0")).await?;
    // a different project's vulnerability never matches
    seed_vulnerability(&ctx.db, Uuid::new_v4(), "lodash", Some("1.0.0")).await?;

    let report = report(
        Some(dependency_scanning_source()),
        vec![component("lodash", "1.0.0", "npm")],
    );
    let mut maps = occurrence_maps(&report);
    ingest_slice(&ctx.db, &pipeline, &mut maps).await?;

    assert_eq!(maps[0].vulnerability_ids, vec![vulnerability]);

    let links = sbom_occurrence_vulnerability::Entity::find()
        .all(&ctx.db)
        .await?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].vulnerability_id, vulnerability);
    assert_eq!(Some(links[0].occurrence_id), maps[0].occurrence_id);

    Ok(())
}
