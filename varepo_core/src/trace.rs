//! Export of line-level traces.
//!
//! A trace tree has a fixed shape: the association root, grouping nodes,
//! one node per file carrying [`PluginArtifactData`], and one node per line
//! carrying [`LineArtifactData`]. Exporting writes each file's lines below a
//! destination directory.

use crate::association::Association;
use crate::data::{ArtifactData, LineArtifactData, PluginArtifactData};
use crate::error::{Error, Result};
use crate::tree::{Forest, NodeId};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument};

const PLUGIN_DEPTH: usize = 3;
const LINE_DEPTH: usize = 4;

/// Validated exporter for one association's trace tree.
#[derive(Debug)]
pub struct TraceExporter<'a> {
    forest: &'a Forest,
    root: NodeId,
    dest: PathBuf,
}

impl<'a> TraceExporter<'a> {
    /// Validate the association and destination before anything is written.
    pub fn new(
        forest: &'a Forest,
        association: &Association,
        dest: impl AsRef<Path>,
    ) -> Result<Self> {
        let root = association.root().ok_or_else(|| {
            Error::invalid_argument(format!("association {} has no tree", association.id()))
        })?;

        let dest = dest.as_ref();
        if !dest.is_dir() {
            return Err(Error::invalid_argument(format!(
                "{} is not a directory",
                dest.display()
            )));
        }

        validate(forest, root, 1)?;

        Ok(Self {
            forest,
            root,
            dest: dest.to_path_buf(),
        })
    }

    /// Write one file per plugin node. Returns the written paths.
    #[instrument(skip(self), fields(dest = %self.dest.display()))]
    pub fn export(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for &group in self.forest.node(self.root)?.children() {
            for &file in self.forest.node(group)?.children() {
                let Some(artifact) = self.forest.artifact_of(file)? else {
                    continue;
                };
                let Some(plugin) = artifact.data().downcast_ref::<PluginArtifactData>() else {
                    continue;
                };

                let mut lines = Vec::new();
                for &line in self.forest.node(file)?.children() {
                    if let Some(data) = self
                        .forest
                        .artifact_of(line)?
                        .and_then(|a| a.data().downcast_ref::<LineArtifactData>())
                    {
                        lines.push(data.line.as_str());
                    }
                }

                let target = self.dest.join(export_path(&plugin.path)?);
                write_atomic(&target, lines.join("\n").as_bytes())?;
                debug!(path = %target.display(), lines = lines.len(), "exported trace file");
                written.push(target);
            }
        }

        info!(files = written.len(), "exported traces");
        Ok(written)
    }
}

fn validate(forest: &Forest, node: NodeId, depth: usize) -> Result<()> {
    if let Some(artifact) = forest.artifact_of(node)? {
        check_payload(artifact.data(), depth)?;
    }
    for &child in forest.node(node)?.children() {
        validate(forest, child, depth + 1)?;
    }
    Ok(())
}

fn check_payload(data: &dyn ArtifactData, depth: usize) -> Result<()> {
    let expected = match depth {
        PLUGIN_DEPTH if !data.is::<PluginArtifactData>() => "PluginArtifactData",
        LINE_DEPTH if !data.is::<LineArtifactData>() => "LineArtifactData",
        d if d > LINE_DEPTH => "no payload",
        _ => return Ok(()),
    };
    Err(Error::wrong_artifact_data_type(
        depth,
        expected,
        data.type_name(),
    ))
}

/// Reduce paths that would escape the destination to their file name.
fn export_path(path: &Path) -> Result<PathBuf> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::Prefix(_) | Component::RootDir | Component::ParentDir
        )
    });
    if !escapes {
        return Ok(path.to_path_buf());
    }
    path.file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::invalid_argument(format!("no file name in {}", path.display())))
}

fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| Error::invalid_argument(format!("no parent for {}", target.display())))?;
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.persist(target)?;
    Ok(())
}
