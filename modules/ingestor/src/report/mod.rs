//! The parsed form of a dependency-scan report.
//!
//! Reports are produced by CI jobs and handed to the ingestion service as
//! read-only documents; nothing in here is mutated during ingestion.

use deptrail_common::purl::Purl;
use deptrail_entity::sbom_component::ComponentType;
use deptrail_entity::sbom_occurrence::Reachability;
use deptrail_entity::source_type::SourceType;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Report {
    pub fn source_type(&self) -> Option<SourceType> {
        self.source.as_ref().map(|source| source.source_type)
    }

    /// Structural pre-flight check. A rejected report is skipped and its
    /// errors are recorded against the pipeline; it never aborts sibling
    /// reports.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (index, component) in self.components.iter().enumerate() {
            if component.name.trim().is_empty() {
                errors.push(format!("component {index}: name must not be empty"));
            }
            if let Some(version) = &component.version {
                if version.trim().is_empty() {
                    errors.push(format!(
                        "component {index} ({}): version must not be blank",
                        component.name
                    ));
                }
            }
        }

        if let Some(source) = &self.source {
            if source.image_tag.is_some() && source.image_name.is_none() {
                errors.push("source: image tag given without an image name".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "type")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<Purl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<Ancestor>,
    #[serde(default)]
    pub reachability: Reachability,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<License>,
}

impl Component {
    pub fn purl_type(&self) -> Option<&str> {
        self.purl.as_ref().map(|purl| purl.ty.as_str())
    }

    /// The durable reference of the component inside a report, used for the
    /// dependency-graph content digest.
    pub fn reference(&self) -> String {
        if let Some(purl) = &self.purl {
            return purl.to_string();
        }
        match &self.version {
            Some(version) => format!("{}@{version}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A direct dependent of a component, as reported by the scanner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spdx_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    pub fn has_spdx_identifier(&self) -> bool {
        self.spdx_identifier
            .as_ref()
            .is_some_and(|spdx| !spdx.trim().is_empty())
    }
}

/// Scanner metadata: where in the project the scan looked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
}
