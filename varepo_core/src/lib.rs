//! # Varepo Core
//!
//! Artifact-tree replication and order encoding for a feature-oriented
//! variant repository.
//!
//! Variant trees (parsed source files, line-based text, ...) are stored as
//! artifact trees tagged with the associations that contributed them. This
//! crate holds the part that keeps those trees consistent as associations are
//! added, copied and dropped.
//!
//! ## Features
//!
//! - Arena-backed artifact trees with `uses`/`used_by` references
//! - Sequence graphs recording the valid orderings of ordered children
//! - Deep copy across identity spaces with at-most-one copy per artifact
//! - Trimming of sequence graphs to a retained set of associations
//! - Content hashing (BLAKE3 or SHA-256) for file-backed artifacts
//!
//! ## Example
//!
//! ```
//! use varepo_core::{EntityFactory, LineArtifactData, MemEntityFactory, deep_copy_tree};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = MemEntityFactory::new();
//! let root = source.create_node()?;
//! let line = source.create_node_with_data(Arc::new(LineArtifactData::new("hello")))?;
//! source.forest_mut().add_child(root, line)?;
//! let source = source.into_forest();
//!
//! let mut target = MemEntityFactory::new();
//! let copy = deep_copy_tree(&source, root, &mut target)?;
//! assert_eq!(target.forest().node(copy)?.children().len(), 1);
//! # Ok(())
//! # }
//! ```

mod association;
mod commit;
mod config;
mod copy;
mod data;
mod error;
mod factory;
mod feature;
mod hash;
mod sequence;
mod trace;
mod tree;
mod trim;

pub use association::{Association, AssociationId, PresenceCondition, association_ids};
pub use commit::{Commit, CommitId, Remote, RemoteType};
pub use config::{Config, DEFAULT_BUFFER_SIZE};
pub use copy::{
    CopyPass, CopyStats, deep_copy_associations, deep_copy_features, deep_copy_tree,
};
pub use data::{ArtifactData, LineArtifactData, PluginArtifactData};
pub use error::{Error, Result};
pub use factory::{EntityFactory, MemEntityFactory};
pub use feature::{Configuration, Feature, FeatureRevision, FeatureVersion};
pub use hash::{Algorithm, HASH_SIZE, Hash, Hasher, content_hash};
pub use sequence::{SequenceGraph, Symbol};
pub use trace::TraceExporter;
pub use tree::{Artifact, ArtifactId, ArtifactReference, Forest, Node, NodeId};
pub use trim::{TrimStats, trim_sequence_graphs};
