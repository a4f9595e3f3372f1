//! Opaque artifact payloads.
//!
//! The core never interprets a payload beyond identity and equality. Format
//! readers attach whatever `Debug + PartialEq` value they need; the two types
//! below are the ones the trace exporter understands.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;

/// Payload carried by an artifact.
pub trait ArtifactData: fmt::Debug + Send + Sync + 'static {
    /// Access the concrete payload for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compare with another payload of possibly different type.
    fn data_eq(&self, other: &dyn ArtifactData) -> bool;

    /// Name of the concrete payload type (for error messages).
    fn type_name(&self) -> &'static str;
}

impl<T> ArtifactData for T
where
    T: fmt::Debug + PartialEq + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn data_eq(&self, other: &dyn ArtifactData) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<T>())
    }
}

impl dyn ArtifactData {
    /// Downcast to a concrete payload type.
    pub fn downcast_ref<T: ArtifactData>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Check the concrete payload type.
    pub fn is<T: ArtifactData>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// A file produced by a reader plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginArtifactData {
    /// Identifier of the plugin that read the file.
    pub plugin_id: String,
    /// Path of the file relative to the import base.
    pub path: PathBuf,
}

impl PluginArtifactData {
    pub fn new(plugin_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for PluginArtifactData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.plugin_id)
    }
}

/// One line of a text file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineArtifactData {
    pub line: String,
}

impl LineArtifactData {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

impl fmt::Display for LineArtifactData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_data_equality_same_type() {
        let a: Arc<dyn ArtifactData> = Arc::new(LineArtifactData::new("x"));
        let b: Arc<dyn ArtifactData> = Arc::new(LineArtifactData::new("x"));
        let c: Arc<dyn ArtifactData> = Arc::new(LineArtifactData::new("y"));

        assert!(a.data_eq(b.as_ref()));
        assert!(!a.data_eq(c.as_ref()));
    }

    #[test]
    fn test_data_equality_across_types() {
        let line: Arc<dyn ArtifactData> = Arc::new(LineArtifactData::new("1"));
        let plain: Arc<dyn ArtifactData> = Arc::new(String::from("1"));

        assert!(!line.data_eq(plain.as_ref()));
        assert!(!plain.data_eq(line.as_ref()));
    }

    #[test]
    fn test_downcast_and_type_name() {
        let data: Arc<dyn ArtifactData> = Arc::new(PluginArtifactData::new("text", "a/b.txt"));

        assert!(data.is::<PluginArtifactData>());
        assert!(data.downcast_ref::<LineArtifactData>().is_none());
        assert_eq!(data.type_name(), "PluginArtifactData");
        assert_eq!(
            data.downcast_ref::<PluginArtifactData>().unwrap().path,
            PathBuf::from("a/b.txt")
        );
    }
}
