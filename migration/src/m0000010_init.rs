use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SbomComponent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomComponent::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomComponent::ComponentType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomComponent::Name).string().not_null())
                    .col(ColumnDef::new(SbomComponent::PurlType).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomComponentVersion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomComponentVersion::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersion::ComponentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomComponentVersion::Version)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SbomComponentVersion::Table,
                                SbomComponentVersion::ComponentId,
                            )
                            .to(SbomComponent::Table, SbomComponent::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomSource::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomSource::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SbomSource::SourceType).string().not_null())
                    .col(ColumnDef::new(SbomSource::Payload).json_binary().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomSourcePackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomSourcePackage::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SbomSourcePackage::Name).string().not_null())
                    .col(ColumnDef::new(SbomSourcePackage::PurlType).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomOccurrence::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomOccurrence::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SbomOccurrence::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(SbomOccurrence::PipelineId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrence::CommitSha).string().not_null())
                    .col(ColumnDef::new(SbomOccurrence::ComponentId).uuid().not_null())
                    .col(ColumnDef::new(SbomOccurrence::ComponentVersionId).uuid())
                    .col(ColumnDef::new(SbomOccurrence::SourceId).uuid())
                    .col(ColumnDef::new(SbomOccurrence::SourcePackageId).uuid())
                    .col(
                        ColumnDef::new(SbomOccurrence::ComponentName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrence::PurlType).string())
                    .col(ColumnDef::new(SbomOccurrence::SourceType).string())
                    .col(ColumnDef::new(SbomOccurrence::PackageManager).string())
                    .col(ColumnDef::new(SbomOccurrence::InputFilePath).string())
                    .col(
                        ColumnDef::new(SbomOccurrence::Licenses)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrence::Ancestors)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrence::Reachability)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SbomOccurrence::Fingerprint).uuid().not_null())
                    .col(
                        ColumnDef::new(SbomOccurrence::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrence::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SbomOccurrence::Table, SbomOccurrence::ComponentId)
                            .to(SbomComponent::Table, SbomComponent::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SbomOccurrence::Table, SbomOccurrence::ComponentVersionId)
                            .to(SbomComponentVersion::Table, SbomComponentVersion::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SbomOccurrence::Table, SbomOccurrence::SourceId)
                            .to(SbomSource::Table, SbomSource::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SbomOccurrence::Table, SbomOccurrence::SourcePackageId)
                            .to(SbomSourcePackage::Table, SbomSourcePackage::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SbomOccurrence::Table)
                    .name("idx_sbom_occurrence_project")
                    .col(SbomOccurrence::ProjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SbomOccurrence::Table)
                    .name("idx_sbom_occurrence_project_source_type")
                    .col(SbomOccurrence::ProjectId)
                    .col(SbomOccurrence::SourceType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vulnerability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vulnerability::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vulnerability::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(Vulnerability::PackageName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vulnerability::PackageVersion).string())
                    .col(ColumnDef::new(Vulnerability::Severity).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Vulnerability::Table)
                    .name("idx_vulnerability_project_package")
                    .col(Vulnerability::ProjectId)
                    .col(Vulnerability::PackageName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SbomOccurrenceVulnerability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SbomOccurrenceVulnerability::OccurrenceId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SbomOccurrenceVulnerability::VulnerabilityId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SbomOccurrenceVulnerability::OccurrenceId)
                            .col(SbomOccurrenceVulnerability::VulnerabilityId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SbomOccurrenceVulnerability::Table,
                                SbomOccurrenceVulnerability::OccurrenceId,
                            )
                            .to(SbomOccurrence::Table, SbomOccurrence::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SbomOccurrenceVulnerability::Table,
                                SbomOccurrenceVulnerability::VulnerabilityId,
                            )
                            .to(Vulnerability::Table, Vulnerability::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SbomOccurrenceVulnerability::Table)
                    .name("idx_sbom_occurrence_vulnerability_vuln")
                    .col(SbomOccurrenceVulnerability::VulnerabilityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DependencyGraphRefresh::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DependencyGraphRefresh::ProjectId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DependencyGraphRefresh::Digest)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DependencyGraphRefresh::PipelineId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DependencyGraphRefresh::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(DependencyGraphRefresh::ProjectId)
                            .col(DependencyGraphRefresh::Digest),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IngestionLease::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IngestionLease::ProjectId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IngestionLease::Holder).uuid().not_null())
                    .col(
                        ColumnDef::new(IngestionLease::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IngestionLease::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(DependencyGraphRefresh::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(SbomOccurrenceVulnerability::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Vulnerability::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SbomOccurrence::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(SbomSourcePackage::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SbomSource::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(SbomComponentVersion::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SbomComponent::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum SbomComponent {
    Table,
    Id,
    ComponentType,
    Name,
    PurlType,
}

#[derive(DeriveIden)]
pub enum SbomComponentVersion {
    Table,
    Id,
    ComponentId,
    Version,
}

#[derive(DeriveIden)]
pub enum SbomSource {
    Table,
    Id,
    SourceType,
    Payload,
}

#[derive(DeriveIden)]
pub enum SbomSourcePackage {
    Table,
    Id,
    Name,
    PurlType,
}

#[derive(DeriveIden)]
pub enum SbomOccurrence {
    Table,
    Id,
    ProjectId,
    PipelineId,
    CommitSha,
    ComponentId,
    ComponentVersionId,
    SourceId,
    SourcePackageId,
    ComponentName,
    PurlType,
    SourceType,
    PackageManager,
    InputFilePath,
    Licenses,
    Ancestors,
    Reachability,
    Fingerprint,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum SbomOccurrenceVulnerability {
    Table,
    OccurrenceId,
    VulnerabilityId,
}

#[derive(DeriveIden)]
pub enum Vulnerability {
    Table,
    Id,
    ProjectId,
    PackageName,
    PackageVersion,
    Severity,
}

#[derive(DeriveIden)]
pub enum DependencyGraphRefresh {
    Table,
    ProjectId,
    Digest,
    PipelineId,
    ExpiresAt,
}

#[derive(DeriveIden)]
pub enum IngestionLease {
    Table,
    ProjectId,
    Holder,
    ExpiresAt,
}
