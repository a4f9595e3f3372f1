//! Features, their versions, and configurations selecting them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One version of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureVersion {
    id: String,
    description: String,
}

impl FeatureVersion {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }
}

/// A feature with its ordered versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    id: String,
    name: String,
    description: String,
    versions: Vec<FeatureVersion>,
}

impl Feature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            versions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Versions in the order they were added.
    pub fn versions(&self) -> &[FeatureVersion] {
        &self.versions
    }

    pub fn version(&self, id: &str) -> Option<&FeatureVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// Add a version, or return the existing one with the same id.
    pub fn add_version(&mut self, id: impl Into<String>) -> &mut FeatureVersion {
        let id = id.into();
        let index = match self.versions.iter().position(|v| v.id == id) {
            Some(index) => index,
            None => {
                self.versions.push(FeatureVersion::new(id));
                self.versions.len() - 1
            }
        };
        &mut self.versions[index]
    }
}

/// Reference to one version of one feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureRevision {
    pub feature_id: String,
    pub version_id: String,
}

impl FeatureRevision {
    pub fn new(feature_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for FeatureRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.feature_id, self.version_id)
    }
}

/// A set of selected feature revisions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Configuration {
    revisions: Vec<FeatureRevision>,
}

impl Configuration {
    /// Create a configuration; duplicate revisions are collapsed.
    pub fn new(mut revisions: Vec<FeatureRevision>) -> Self {
        revisions.sort();
        revisions.dedup();
        Self { revisions }
    }

    pub fn revisions(&self) -> &[FeatureRevision] {
        &self.revisions
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.revisions.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}
