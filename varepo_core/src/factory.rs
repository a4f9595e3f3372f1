//! The creation boundary.
//!
//! Format readers, merge logic and the replication engine create every
//! entity through an [`EntityFactory`]. The factory owns the target
//! [`Forest`], so whatever it creates lives in one identity space.

use crate::association::{Association, AssociationId};
use crate::commit::{Commit, CommitId, Remote, RemoteType};
use crate::data::ArtifactData;
use crate::error::{Error, Result};
use crate::feature::{Configuration, Feature, FeatureRevision};
use crate::sequence::SequenceGraph;
use crate::tree::{ArtifactId, Forest, NodeId};
use std::collections::HashSet;
use std::sync::Arc;

/// Creates entities in the factory's identity space.
///
/// Only the accessors and id allocators are required; every constructor has
/// a default built on them. Implementations may override constructors to
/// enforce limits; errors propagate out of whatever pass called them.
pub trait EntityFactory {
    /// The identity space entities are created in.
    fn forest(&self) -> &Forest;

    fn forest_mut(&mut self) -> &mut Forest;

    /// Allocate a fresh association id.
    fn next_association_id(&mut self) -> AssociationId;

    /// Allocate a fresh commit id.
    fn next_commit_id(&mut self) -> CommitId;

    /// Create a remote with the given name, address and type.
    fn create_remote(
        &mut self,
        name: &str,
        address: &str,
        remote_type: RemoteType,
    ) -> Result<Remote> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Remote name cannot be empty"));
        }
        Ok(Remote {
            name: name.to_string(),
            address: address.to_string(),
            remote_type,
        })
    }

    /// Create an empty commit.
    fn create_commit(&mut self) -> Result<Commit> {
        Ok(Commit::new(self.next_commit_id()))
    }

    /// Create a configuration containing the given feature revisions.
    fn create_configuration(&mut self, revisions: Vec<FeatureRevision>) -> Result<Configuration> {
        Ok(Configuration::new(revisions))
    }

    /// Create a feature without versions.
    fn create_feature(&mut self, id: &str, name: &str) -> Result<Feature> {
        if id.is_empty() {
            return Err(Error::invalid_argument("Feature id cannot be empty"));
        }
        Ok(Feature::new(id, name))
    }

    /// Create an artifact holding `data`.
    fn create_artifact(&mut self, data: Arc<dyn ArtifactData>) -> Result<ArtifactId> {
        Ok(self.forest_mut().create_artifact(data))
    }

    /// Create an empty association.
    fn create_association(&mut self) -> Result<Association> {
        Ok(Association::new(self.next_association_id()))
    }

    /// Create an association whose new root node holds `nodes` as children.
    ///
    /// Every node must exist, be detached and appear once. Nothing is
    /// created unless all of them qualify.
    fn create_association_from(&mut self, nodes: &[NodeId]) -> Result<Association> {
        let mut seen = HashSet::with_capacity(nodes.len());
        for &node in nodes {
            if !seen.insert(node) {
                return Err(Error::invalid_argument(format!(
                    "{} listed more than once",
                    node
                )));
            }
            if self.forest().node(node)?.parent().is_some() {
                return Err(Error::invalid_argument(format!(
                    "{} already has a parent",
                    node
                )));
            }
        }

        let id = self.next_association_id();
        let root = self.create_node()?;
        for &node in nodes {
            self.forest_mut().add_child(root, node)?;
        }
        self.forest_mut().set_root_association(root, Some(id))?;
        Ok(Association::new(id).with_root(root))
    }

    /// Create an empty node.
    fn create_node(&mut self) -> Result<NodeId> {
        Ok(self.forest_mut().create_node())
    }

    /// Create a node holding `artifact`.
    ///
    /// The node becomes the artifact's containing node unless another node
    /// already claimed it.
    fn create_node_with_artifact(&mut self, artifact: ArtifactId) -> Result<NodeId> {
        self.forest().artifact(artifact)?;
        let node = self.create_node()?;
        let forest = self.forest_mut();
        forest.set_artifact(node, Some(artifact))?;
        let artifact = forest.artifact_mut(artifact)?;
        if artifact.containing_node().is_none() {
            artifact.set_containing_node(Some(node));
        }
        Ok(node)
    }

    /// Create a node holding a new artifact with `data`.
    fn create_node_with_data(&mut self, data: Arc<dyn ArtifactData>) -> Result<NodeId> {
        let artifact = self.create_artifact(data)?;
        self.create_node_with_artifact(artifact)
    }

    /// Create a node whose artifact orders its children.
    ///
    /// The artifact is marked ordered and receives an empty sequence graph if
    /// it has none.
    fn create_ordered_node(&mut self, artifact: ArtifactId) -> Result<NodeId> {
        let node = self.create_node_with_artifact(artifact)?;
        let artifact = self.forest_mut().artifact_mut(artifact)?;
        artifact.set_ordered(true);
        if artifact.sequence_graph().is_none() {
            artifact.set_sequence_graph(Some(SequenceGraph::new()));
        }
        Ok(node)
    }

    /// Create an ordered node holding a new artifact with `data`.
    fn create_ordered_node_with_data(&mut self, data: Arc<dyn ArtifactData>) -> Result<NodeId> {
        let artifact = self.create_artifact(data)?;
        self.create_ordered_node(artifact)
    }
}

/// In-memory creation boundary.
#[derive(Debug, Default)]
pub struct MemEntityFactory {
    forest: Forest,
    next_association: u64,
    next_commit: u64,
    node_limit: Option<usize>,
}

impl MemEntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create more than `limit` nodes in total.
    pub fn with_node_limit(limit: usize) -> Self {
        Self {
            node_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Take the forest out of the factory.
    pub fn into_forest(self) -> Forest {
        self.forest
    }
}

impl EntityFactory for MemEntityFactory {
    fn forest(&self) -> &Forest {
        &self.forest
    }

    fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forest
    }

    fn next_association_id(&mut self) -> AssociationId {
        self.next_association += 1;
        AssociationId::new(self.next_association)
    }

    fn next_commit_id(&mut self) -> CommitId {
        self.next_commit += 1;
        CommitId::new(self.next_commit)
    }

    fn create_node(&mut self) -> Result<NodeId> {
        if let Some(limit) = self.node_limit
            && self.forest.node_count() >= limit
        {
            return Err(Error::invalid_argument(format!(
                "node limit of {} reached",
                limit
            )));
        }
        Ok(self.forest.create_node())
    }
}
