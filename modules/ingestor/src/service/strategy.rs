use deptrail_entity::source_type::SourceType;

/// How one pipeline's batch of reports is ingested.
///
/// Both strategies run the same ingest-then-prune sequence; they differ in
/// which stored occurrences compete with the run's results when pruning.
/// Registry-scanned images have different staleness semantics than
/// source-code scans, so they never prune each other's occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Default,
    ContainerScanningForRegistry,
}

/// Resolved once per ingestion run from the valid reports' source types.
pub fn select_strategy<I>(source_types: I) -> StrategyKind
where
    I: IntoIterator<Item = SourceType>,
{
    if source_types
        .into_iter()
        .any(|source_type| source_type == SourceType::ContainerScanningForRegistry)
    {
        StrategyKind::ContainerScanningForRegistry
    } else {
        StrategyKind::Default
    }
}

impl StrategyKind {
    /// The source types whose stored occurrences are eligible for pruning
    /// under this strategy; `None` covers occurrences recorded without a
    /// source.
    pub fn considered_source_types(&self) -> &'static [Option<SourceType>] {
        match self {
            Self::Default => &[
                Some(SourceType::DependencyScanning),
                Some(SourceType::ContainerScanning),
                None,
            ],
            Self::ContainerScanningForRegistry => {
                &[Some(SourceType::ContainerScanningForRegistry)]
            }
        }
    }
}
