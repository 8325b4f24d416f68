pub mod prune;
pub mod slice;
pub mod tasks;

use crate::model::Pipeline;
use crate::report;
use deptrail_entity::sbom_occurrence;
use sea_orm::ActiveValue::Set;
use time::OffsetDateTime;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x0b, 0x84, 0x1d, 0x2c, 0x7a, 0x55, 0x4e, 0x1f, 0x93, 0x6e, 0xa1, 0x4d, 0x58, 0x02, 0xc4, 0x71,
]);

/// Correlates one report component (and its source) with the identifiers
/// assigned during persistence.
///
/// One map exists per (component, source) pair for the duration of a single
/// ingestion run; the task pipeline fills the identifiers in stage order
/// and the map is discarded once the run's occurrence/source ids have been
/// collected.
#[derive(Debug, Clone)]
pub struct OccurrenceMap {
    pub component: report::Component,
    pub source: Option<report::Source>,
    pub component_id: Option<Uuid>,
    pub component_version_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub source_package_id: Option<Uuid>,
    pub occurrence_id: Option<Uuid>,
    pub vulnerability_ids: Vec<Uuid>,
}

impl OccurrenceMap {
    pub fn new(component: report::Component, source: Option<report::Source>) -> Self {
        Self {
            component,
            source,
            component_id: None,
            component_version_id: None,
            source_id: None,
            source_package_id: None,
            occurrence_id: None,
            vulnerability_ids: Vec::new(),
        }
    }

    pub fn packager(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|source| source.packager.as_deref())
    }

    pub fn purl_type(&self) -> Option<&str> {
        self.component.purl_type()
    }

    /// Container image scans carry no meaningful file path; the synthesized
    /// image reference is the only durable join key available for them.
    pub fn input_file_path(&self) -> Option<String> {
        let source = self.source.as_ref()?;

        if source.source_type.is_container_scanning() {
            if let (Some(name), Some(tag)) = (&source.image_name, &source.image_tag) {
                return Some(format!("container-image:{name}:{tag}"));
            }
        }

        source.input_file_path.clone()
    }

    /// Licenses recorded on the occurrence row: only entries carrying a
    /// usable SPDX identifier, and none at all for components without a
    /// pURL.
    pub fn licenses(&self) -> Vec<report::License> {
        if self.component.purl.is_none() {
            return Vec::new();
        }

        self.component
            .licenses
            .iter()
            .filter(|license| license.has_spdx_identifier())
            .cloned()
            .collect()
    }

    /// The full attribute bag of the occurrence upsert.
    pub(crate) fn to_model(
        &self,
        pipeline: &Pipeline,
        id: Uuid,
        component_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<sbom_occurrence::ActiveModel, serde_json::Error> {
        let licenses = serde_json::to_value(self.licenses())?;
        let ancestors = serde_json::to_value(&self.component.ancestors)?;
        let fingerprint = self.fingerprint(&licenses, &ancestors);

        Ok(sbom_occurrence::ActiveModel {
            id: Set(id),
            project_id: Set(pipeline.project_id),
            pipeline_id: Set(pipeline.id),
            commit_sha: Set(pipeline.commit_sha.clone()),
            component_id: Set(component_id),
            component_version_id: Set(self.component_version_id),
            source_id: Set(self.source_id),
            source_package_id: Set(self.source_package_id),
            component_name: Set(self.component.name.clone()),
            purl_type: Set(self.purl_type().map(ToString::to_string)),
            source_type: Set(self.source.as_ref().map(|source| source.source_type)),
            package_manager: Set(self.packager().map(ToString::to_string)),
            input_file_path: Set(self.input_file_path()),
            licenses: Set(licenses),
            ancestors: Set(ancestors),
            reachability: Set(self.component.reachability),
            fingerprint: Set(fingerprint),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    /// Digest over the mutable attributes; unchanged rows are recognized by
    /// an equal fingerprint and skipped by the upsert's conflict clause.
    fn fingerprint(&self, licenses: &serde_json::Value, ancestors: &serde_json::Value) -> Uuid {
        let mut result = Uuid::new_v5(&NAMESPACE, licenses.to_string().as_bytes());
        result = Uuid::new_v5(&result, ancestors.to_string().as_bytes());
        if let Some(packager) = self.packager() {
            result = Uuid::new_v5(&result, packager.as_bytes());
        }
        if let Some(path) = self.input_file_path() {
            result = Uuid::new_v5(&result, path.as_bytes());
        }
        if let Some(source_package_id) = self.source_package_id {
            result = Uuid::new_v5(&result, source_package_id.as_bytes());
        }
        Uuid::new_v5(
            &result,
            format!("{:?}", self.component.reachability).as_bytes(),
        )
    }
}

/// One occurrence map per report component, all sharing the report's
/// source.
pub fn occurrence_maps(report: &report::Report) -> Vec<OccurrenceMap> {
    report
        .components
        .iter()
        .map(|component| OccurrenceMap::new(component.clone(), report.source.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deptrail_entity::source_type::SourceType;

    fn component(name: &str) -> report::Component {
        report::Component {
            name: name.to_string(),
            version: Some("1.0.0".to_string()),
            component_type: Default::default(),
            purl: Some(format!("pkg:npm/{name}@1.0.0").parse().expect("a purl")),
            source_package_name: None,
            ancestors: Vec::new(),
            reachability: Default::default(),
            licenses: Vec::new(),
        }
    }

    fn container_source(name: Option<&str>, tag: Option<&str>) -> report::Source {
        report::Source {
            source_type: SourceType::ContainerScanning,
            packager: None,
            input_file_path: Some("Dockerfile".to_string()),
            image_name: name.map(ToString::to_string),
            image_tag: tag.map(ToString::to_string),
            operating_system: None,
        }
    }

    #[test]
    fn synthesizes_container_image_path() {
        let map = OccurrenceMap::new(
            component("alpine-baselayout"),
            Some(container_source(Some("docker.io/library/alpine"), Some("3.12"))),
        );
        assert_eq!(
            map.input_file_path().as_deref(),
            Some("container-image:docker.io/library/alpine:3.12")
        );
    }

    #[test]
    fn falls_back_to_the_source_path_without_a_full_image_reference() {
        let map = OccurrenceMap::new(
            component("alpine-baselayout"),
            Some(container_source(Some("docker.io/library/alpine"), None)),
        );
        assert_eq!(map.input_file_path().as_deref(), Some("Dockerfile"));
    }

    #[test]
    fn no_input_file_path_without_a_source() {
        let map = OccurrenceMap::new(component("lodash"), None);
        assert_eq!(map.input_file_path(), None);
    }

    #[test]
    fn drops_licenses_without_spdx_identifier() {
        let mut with_licenses = component("lodash");
        with_licenses.licenses = vec![
            report::License {
                name: Some("MIT License".to_string()),
                spdx_identifier: Some("MIT".to_string()),
                url: None,
            },
            report::License {
                name: Some("mystery".to_string()),
                spdx_identifier: Some("  ".to_string()),
                url: None,
            },
            report::License {
                name: Some("unnamed".to_string()),
                spdx_identifier: None,
                url: None,
            },
        ];

        let map = OccurrenceMap::new(with_licenses, None);
        let licenses = map.licenses();
        assert_eq!(licenses.len(), 1);
        assert_eq!(licenses[0].spdx_identifier.as_deref(), Some("MIT"));
    }

    #[test]
    fn no_licenses_without_a_purl() {
        let mut unpurled = component("lodash");
        unpurled.purl = None;
        unpurled.licenses = vec![report::License {
            name: Some("MIT License".to_string()),
            spdx_identifier: Some("MIT".to_string()),
            url: None,
        }];

        assert!(OccurrenceMap::new(unpurled, None).licenses().is_empty());
    }
}
