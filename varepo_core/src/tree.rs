//! Arena-backed artifact trees.
//!
//! A [`Forest`] is one identity space. Nodes and artifacts are addressed by
//! typed indices; parent links, containing-node links and reference endpoints
//! are plain ids, so they never keep anything alive.

use crate::association::AssociationId;
use crate::data::ArtifactData;
use crate::error::{Error, Result};
use crate::sequence::SequenceGraph;
use std::fmt;
use std::sync::Arc;

/// Identifier of a node within one forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifier of an artifact within one forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactId(u32);

impl ArtifactId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact#{}", self.0)
    }
}

/// Directed non-containment edge between two artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactReference {
    pub source: ArtifactId,
    pub target: ArtifactId,
    /// Reference kind tag (opaque to the core).
    pub kind: String,
}

/// Tree element.
#[derive(Debug, Clone)]
pub struct Node {
    unique: bool,
    artifact: Option<ArtifactId>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    association: Option<AssociationId>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            unique: true,
            artifact: None,
            children: Vec::new(),
            parent: None,
            association: None,
        }
    }
}

impl Node {
    /// True if this node belongs to exactly one association.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Mark the node as exclusive to one association or shared.
    pub fn set_unique(&mut self, unique: bool) {
        self.unique = unique;
    }

    /// Artifact held by this node.
    pub fn artifact(&self) -> Option<ArtifactId> {
        self.artifact
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node; `None` for a tree root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Association this node is the root of, if any.
    pub fn association(&self) -> Option<AssociationId> {
        self.association
    }
}

/// Payload holder plus structural metadata.
#[derive(Debug, Clone)]
pub struct Artifact {
    data: Arc<dyn ArtifactData>,
    atomic: bool,
    ordered: bool,
    sequence_number: i32,
    containing_node: Option<NodeId>,
    sequence_graph: Option<SequenceGraph>,
    uses: Vec<ArtifactReference>,
    used_by: Vec<ArtifactReference>,
}

impl Artifact {
    fn new(data: Arc<dyn ArtifactData>) -> Self {
        Self {
            data,
            atomic: false,
            ordered: false,
            sequence_number: 0,
            containing_node: None,
            sequence_graph: None,
            uses: Vec::new(),
            used_by: Vec::new(),
        }
    }

    /// Opaque payload.
    pub fn data(&self) -> &dyn ArtifactData {
        self.data.as_ref()
    }

    /// Shared handle to the payload.
    pub fn data_handle(&self) -> Arc<dyn ArtifactData> {
        Arc::clone(&self.data)
    }

    /// True if the artifact's subtree is treated as one unit.
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Set the atomic flag.
    pub fn set_atomic(&mut self, atomic: bool) {
        self.atomic = atomic;
    }

    /// True if the order of this artifact's children is meaningful.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Set the ordered flag.
    pub fn set_ordered(&mut self, ordered: bool) {
        self.ordered = ordered;
    }

    /// Position assigned among siblings by the owning sequence graph.
    pub fn sequence_number(&self) -> i32 {
        self.sequence_number
    }

    /// Set the sibling position.
    pub fn set_sequence_number(&mut self, sequence_number: i32) {
        self.sequence_number = sequence_number;
    }

    /// Node that uniquely holds this artifact, if any.
    pub fn containing_node(&self) -> Option<NodeId> {
        self.containing_node
    }

    /// Set or clear the back-reference to the unique holder.
    pub fn set_containing_node(&mut self, node: Option<NodeId>) {
        self.containing_node = node;
    }

    /// Order-encoding graph owned by an ordered artifact.
    pub fn sequence_graph(&self) -> Option<&SequenceGraph> {
        self.sequence_graph.as_ref()
    }

    /// Mutable access to the owned sequence graph.
    pub fn sequence_graph_mut(&mut self) -> Option<&mut SequenceGraph> {
        self.sequence_graph.as_mut()
    }

    /// Replace or remove the owned sequence graph.
    pub fn set_sequence_graph(&mut self, graph: Option<SequenceGraph>) {
        self.sequence_graph = graph;
    }

    /// Outgoing references.
    pub fn uses(&self) -> &[ArtifactReference] {
        &self.uses
    }

    /// Incoming references.
    pub fn used_by(&self) -> &[ArtifactReference] {
        &self.used_by
    }
}

/// One identity space of nodes and artifacts.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    artifacts: Vec<Artifact>,
}

impl Forest {
    /// Create an empty identity space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever created.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of artifacts ever created.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Create an empty, unique, detached node.
    pub fn create_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::default());
        id
    }

    /// Create an artifact holding `data`.
    pub fn create_artifact(&mut self, data: Arc<dyn ArtifactData>) -> ArtifactId {
        let id = ArtifactId(self.artifacts.len() as u32);
        self.artifacts.push(Artifact::new(data));
        id
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::unknown_node(id))
    }

    /// Look up a node for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::unknown_node(id))
    }

    /// Look up an artifact.
    pub fn artifact(&self, id: ArtifactId) -> Result<&Artifact> {
        self.artifacts
            .get(id.index())
            .ok_or_else(|| Error::unknown_artifact(id))
    }

    /// Look up an artifact for mutation.
    pub fn artifact_mut(&mut self, id: ArtifactId) -> Result<&mut Artifact> {
        self.artifacts
            .get_mut(id.index())
            .ok_or_else(|| Error::unknown_artifact(id))
    }

    /// Artifact held by `node`, if any.
    pub fn artifact_of(&self, node: NodeId) -> Result<Option<&Artifact>> {
        match self.node(node)?.artifact {
            Some(artifact) => self.artifact(artifact).map(Some),
            None => Ok(None),
        }
    }

    /// Iterate over all artifacts with their ids.
    pub fn artifacts(&self) -> impl Iterator<Item = (ArtifactId, &Artifact)> {
        self.artifacts
            .iter()
            .enumerate()
            .map(|(i, artifact)| (ArtifactId(i as u32), artifact))
    }

    /// Attach or detach the artifact of a node.
    pub fn set_artifact(&mut self, node: NodeId, artifact: Option<ArtifactId>) -> Result<()> {
        if let Some(artifact) = artifact {
            self.artifact(artifact)?;
        }
        self.node_mut(node)?.artifact = artifact;
        Ok(())
    }

    /// Append `child` to the children of `parent`.
    ///
    /// The child must be detached and must not be an ancestor of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        if self.node(child)?.parent.is_some() {
            return Err(Error::invalid_argument(format!(
                "{} already has a parent",
                child
            )));
        }

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(Error::invalid_argument(format!(
                    "adding {} under {} would create a cycle",
                    child, parent
                )));
            }
            cursor = self.node(current)?.parent;
        }

        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Mark `root` as the root node of an association.
    pub fn set_root_association(
        &mut self,
        root: NodeId,
        association: Option<AssociationId>,
    ) -> Result<()> {
        self.node_mut(root)?.association = association;
        Ok(())
    }

    /// Walk up to the tree root and report the association it belongs to.
    pub fn containing_association(&self, node: NodeId) -> Result<Option<AssociationId>> {
        let mut current = node;
        loop {
            let n = self.node(current)?;
            match n.parent {
                Some(parent) => current = parent,
                None => return Ok(n.association),
            }
        }
    }

    /// Add a `source -> target` reference of the given kind.
    ///
    /// The edge is recorded in `source.uses` and `target.used_by`. Returns
    /// false if an identical edge already exists.
    pub fn add_reference(
        &mut self,
        source: ArtifactId,
        target: ArtifactId,
        kind: impl Into<String>,
    ) -> Result<bool> {
        self.artifact(target)?;
        let reference = ArtifactReference {
            source,
            target,
            kind: kind.into(),
        };

        let source_artifact = self.artifact_mut(source)?;
        if source_artifact.uses.contains(&reference) {
            return Ok(false);
        }
        source_artifact.uses.push(reference.clone());
        self.artifact_mut(target)?.used_by.push(reference);
        Ok(true)
    }

    /// Drop every node and artifact created after the forest had `nodes`
    /// nodes and `artifacts` artifacts, and unlink the survivors from them.
    pub(crate) fn truncate(&mut self, nodes: usize, artifacts: usize) {
        self.nodes.truncate(nodes);
        self.artifacts.truncate(artifacts);

        let live_node = |id: &NodeId| id.index() < nodes;
        let live_artifact = |id: &ArtifactId| id.index() < artifacts;

        for node in &mut self.nodes {
            node.children.retain(live_node);
            node.parent = node.parent.filter(live_node);
            node.artifact = node.artifact.filter(live_artifact);
        }
        for artifact in &mut self.artifacts {
            artifact.containing_node = artifact.containing_node.filter(live_node);
            artifact
                .uses
                .retain(|r| live_artifact(&r.source) && live_artifact(&r.target));
            artifact
                .used_by
                .retain(|r| live_artifact(&r.source) && live_artifact(&r.target));
        }
    }

    /// All nodes of the subtree rooted at `root`, in pre-order.
    pub fn descendants(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LineArtifactData;

    fn line(forest: &mut Forest, text: &str) -> ArtifactId {
        forest.create_artifact(Arc::new(LineArtifactData::new(text)))
    }

    #[test]
    fn test_new_node_defaults() {
        let mut forest = Forest::new();
        let id = forest.create_node();
        let node = forest.node(id).unwrap();

        assert!(node.is_unique());
        assert!(node.artifact().is_none());
        assert!(node.children().is_empty());
        assert!(node.parent().is_none());
    }

    #[test]
    fn test_add_child_sets_parent() {
        let mut forest = Forest::new();
        let root = forest.create_node();
        let a = forest.create_node();
        let b = forest.create_node();
        forest.add_child(root, a).unwrap();
        forest.add_child(root, b).unwrap();

        assert_eq!(forest.node(root).unwrap().children(), &[a, b]);
        assert_eq!(forest.node(b).unwrap().parent(), Some(root));
        assert_eq!(forest.descendants(root).unwrap(), vec![root, a, b]);
    }

    #[test]
    fn test_add_child_rejects_cycle_and_reparenting() {
        let mut forest = Forest::new();
        let root = forest.create_node();
        let child = forest.create_node();
        let other = forest.create_node();
        forest.add_child(root, child).unwrap();

        assert!(matches!(
            forest.add_child(child, root),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            forest.add_child(other, child),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(forest.add_child(root, root).is_err());

        // Rejected links leave the tree untouched.
        assert_eq!(forest.node_count(), 3);
        assert_eq!(forest.node(root).unwrap().parent(), None);
        assert_eq!(forest.node(root).unwrap().children(), &[child]);
        assert_eq!(forest.node(child).unwrap().parent(), Some(root));
        assert!(forest.node(child).unwrap().children().is_empty());
        assert!(forest.node(other).unwrap().children().is_empty());
    }

    #[test]
    fn test_truncate_unlinks_survivors() {
        let mut forest = Forest::new();
        let root = forest.create_node();
        let kept = line(&mut forest, "kept");
        let (nodes, artifacts) = (forest.node_count(), forest.artifact_count());

        let child = forest.create_node();
        let added = line(&mut forest, "added");
        forest.add_child(root, child).unwrap();
        forest.set_artifact(root, Some(added)).unwrap();
        forest.add_reference(kept, added, "uses").unwrap();
        forest.add_reference(added, kept, "uses").unwrap();
        forest
            .artifact_mut(kept)
            .unwrap()
            .set_containing_node(Some(child));

        forest.truncate(nodes, artifacts);

        assert_eq!(forest.node_count(), 1);
        assert_eq!(forest.artifact_count(), 1);
        let root_node = forest.node(root).unwrap();
        assert!(root_node.children().is_empty());
        assert!(root_node.artifact().is_none());
        let kept_artifact = forest.artifact(kept).unwrap();
        assert!(kept_artifact.uses().is_empty());
        assert!(kept_artifact.used_by().is_empty());
        assert!(kept_artifact.containing_node().is_none());
    }

    #[test]
    fn test_references_are_two_views_of_one_edge() {
        let mut forest = Forest::new();
        let a = line(&mut forest, "a");
        let b = line(&mut forest, "b");

        assert!(forest.add_reference(a, b, "call").unwrap());
        assert!(!forest.add_reference(a, b, "call").unwrap());
        assert!(forest.add_reference(a, b, "read").unwrap());

        let uses = forest.artifact(a).unwrap().uses();
        let used_by = forest.artifact(b).unwrap().used_by();
        assert_eq!(uses.len(), 2);
        assert_eq!(uses, used_by);
    }

    #[test]
    fn test_containing_association() {
        let mut forest = Forest::new();
        let root = forest.create_node();
        let mid = forest.create_node();
        let leaf = forest.create_node();
        forest.add_child(root, mid).unwrap();
        forest.add_child(mid, leaf).unwrap();

        assert_eq!(forest.containing_association(leaf).unwrap(), None);

        forest
            .set_root_association(root, Some(AssociationId::new(7)))
            .unwrap();
        assert_eq!(
            forest.containing_association(leaf).unwrap(),
            Some(AssociationId::new(7))
        );
    }

    #[test]
    fn test_unknown_ids() {
        let mut other = Forest::new();
        let node = other.create_node();
        let artifact = line(&mut other, "x");

        let forest = Forest::new();
        assert!(matches!(forest.node(node), Err(Error::UnknownNode { .. })));
        assert!(matches!(
            forest.artifact(artifact),
            Err(Error::UnknownArtifact { .. })
        ));
    }
}
