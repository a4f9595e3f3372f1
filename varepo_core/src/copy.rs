//! Tree replication across identity spaces.
//!
//! A copy runs in two passes. The structural pass walks the source tree
//! depth-first, creating nodes and artifacts through the factory and filling a
//! pass-scoped identity map (source artifact -> target artifact). Each source
//! artifact is copied at most once however many paths reach it. The second
//! pass resolves references and clones sequence graphs through that map, so
//! the result does not depend on traversal order.

use crate::association::{Association, AssociationId};
use crate::error::{Error, Result};
use crate::factory::EntityFactory;
use crate::feature::Feature;
use crate::sequence::SequenceGraph;
use crate::tree::{ArtifactId, Forest, NodeId};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Statistics from one copy pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Nodes created in the target.
    pub nodes_copied: usize,
    /// Artifacts created in the target.
    pub artifacts_copied: usize,
    /// Node visits that reused an already copied artifact.
    pub artifacts_reused: usize,
    /// References created between target artifacts.
    pub references_copied: usize,
    /// References whose other endpoint was never copied.
    pub references_dropped: usize,
    /// Sequence graphs cloned.
    pub graphs_copied: usize,
    /// Sequence-graph symbols that had no copy and were projected away.
    pub symbols_dropped: usize,
}

/// Copy context holding the identity map of one pass.
///
/// Several roots may be copied in the same pass; artifacts shared between
/// them are copied once. The map is dropped with the pass.
///
/// Output is only kept once [`CopyPass::finish`] succeeds. A failed step, or
/// dropping the pass unfinished, truncates the target forest back to where
/// it stood when the pass began.
pub struct CopyPass<'a, F: EntityFactory + ?Sized> {
    source: &'a Forest,
    factory: &'a mut F,
    replacements: HashMap<ArtifactId, ArtifactId>,
    copied: Vec<(ArtifactId, ArtifactId)>,
    owners: HashMap<ArtifactId, NodeId>,
    stats: CopyStats,
    /// Target node and artifact counts when the pass began.
    mark: (usize, usize),
    finished: bool,
}

impl<'a, F: EntityFactory + ?Sized> CopyPass<'a, F> {
    /// Start a pass copying from `source` into the factory's forest.
    pub fn new(source: &'a Forest, factory: &'a mut F) -> Self {
        let forest = factory.forest();
        let mark = (forest.node_count(), forest.artifact_count());
        Self {
            source,
            factory,
            replacements: HashMap::new(),
            copied: Vec::new(),
            owners: HashMap::new(),
            stats: CopyStats::default(),
            mark,
            finished: false,
        }
    }

    /// Target artifact already created for `source`, if any.
    pub fn replacement(&self, source: ArtifactId) -> Option<ArtifactId> {
        self.replacements.get(&source).copied()
    }

    /// Structurally copy the tree under `root` and return the new root.
    ///
    /// References and sequence graphs are completed by [`CopyPass::finish`].
    /// On error everything this pass created so far is discarded, including
    /// trees copied by earlier calls.
    pub fn copy_tree(&mut self, root: NodeId) -> Result<NodeId> {
        self.source.node(root)?;
        let copied = self.copy_node(root);
        if copied.is_err() {
            self.rollback();
        }
        copied
    }

    /// Mark a copied root as the root of `association`.
    fn tag_root(&mut self, root: NodeId, association: AssociationId) -> Result<()> {
        let tagged = self
            .factory
            .forest_mut()
            .set_root_association(root, Some(association));
        if tagged.is_err() {
            self.rollback();
        }
        tagged
    }

    /// Discard everything the pass created.
    pub fn abort(mut self) {
        self.rollback();
        self.finished = true;
    }

    fn rollback(&mut self) {
        let (nodes, artifacts) = self.mark;
        let forest = self.factory.forest_mut();
        let discarded = forest.node_count().saturating_sub(nodes);
        forest.truncate(nodes, artifacts);

        self.replacements.clear();
        self.copied.clear();
        self.owners.clear();
        self.stats = CopyStats::default();
        debug!(nodes = discarded, "copy pass rolled back");
    }

    fn copy_node(&mut self, node: NodeId) -> Result<NodeId> {
        let source = self.source;
        let source_node = source.node(node)?;

        let target = self.factory.create_node()?;
        self.stats.nodes_copied += 1;
        {
            let forest = self.factory.forest_mut();
            forest.node_mut(target)?.set_unique(source_node.is_unique());
            forest.set_root_association(target, source_node.association())?;
        }

        if let Some(artifact) = source_node.artifact() {
            let target_artifact = match self.replacements.get(&artifact) {
                Some(&existing) => {
                    self.stats.artifacts_reused += 1;
                    existing
                }
                None => self.copy_artifact(artifact)?,
            };

            let forest = self.factory.forest_mut();
            forest.set_artifact(target, Some(target_artifact))?;

            if source_node.is_unique() {
                if let Some(&owner) = self.owners.get(&target_artifact) {
                    return Err(Error::invalid_argument(format!(
                        "{} is held uniquely by both {} and {}",
                        artifact, owner, target
                    )));
                }
                self.owners.insert(target_artifact, target);
                forest
                    .artifact_mut(target_artifact)?
                    .set_containing_node(Some(target));
            }
        }

        for &child in source_node.children() {
            let child_copy = self.copy_node(child)?;
            self.factory.forest_mut().add_child(target, child_copy)?;
        }

        Ok(target)
    }

    fn copy_artifact(&mut self, artifact: ArtifactId) -> Result<ArtifactId> {
        let source_artifact = self.source.artifact(artifact)?;
        let created = self.factory.create_artifact(source_artifact.data_handle())?;

        let target = self.factory.forest_mut().artifact_mut(created)?;
        target.set_atomic(source_artifact.is_atomic());
        target.set_ordered(source_artifact.is_ordered());
        target.set_sequence_number(source_artifact.sequence_number());

        // Registered before children are visited so reconvergent paths reuse it.
        self.replacements.insert(artifact, created);
        self.copied.push((artifact, created));
        self.stats.artifacts_copied += 1;
        Ok(created)
    }

    /// Resolve references and clone sequence graphs, ending the pass.
    ///
    /// On error the pass is rolled back.
    pub fn finish(mut self) -> Result<CopyStats> {
        self.link()?;
        self.finished = true;
        debug!(stats = ?self.stats, "copy pass finished");
        Ok(std::mem::take(&mut self.stats))
    }

    fn link(&mut self) -> Result<()> {
        let source = self.source;

        // Reference phase
        for &(from, to) in &self.copied {
            let source_artifact = source.artifact(from)?;

            for reference in source_artifact.uses() {
                match self.replacements.get(&reference.target) {
                    Some(&target) => {
                        if self.factory.forest_mut().add_reference(
                            to,
                            target,
                            reference.kind.clone(),
                        )? {
                            self.stats.references_copied += 1;
                        }
                    }
                    None => self.stats.references_dropped += 1,
                }
            }

            // Incoming edges from copied sources are created from the source side.
            self.stats.references_dropped += source_artifact
                .used_by()
                .iter()
                .filter(|r| !self.replacements.contains_key(&r.source))
                .count();
        }

        // Sequence-graph phase
        for &(from, to) in &self.copied {
            let Some(graph) = source.artifact(from)?.sequence_graph() else {
                continue;
            };

            let mut copy = SequenceGraph::new();
            let dropped = copy.copy(graph, |symbol| self.replacements.get(&symbol).copied());
            if !dropped.is_empty() {
                warn!(
                    artifact = %from,
                    dropped = dropped.len(),
                    "sequence graph symbols without a copy were projected away"
                );
                self.stats.symbols_dropped += dropped.len();
            }

            self.factory
                .forest_mut()
                .artifact_mut(to)?
                .set_sequence_graph(Some(copy));
            self.stats.graphs_copied += 1;
        }
        Ok(())
    }
}

impl<F: EntityFactory + ?Sized> Drop for CopyPass<'_, F> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback();
        }
    }
}

/// Deep-copy the tree under `root` from `source` into the factory's forest.
#[instrument(skip(source, factory))]
pub fn deep_copy_tree<F: EntityFactory + ?Sized>(
    source: &Forest,
    root: NodeId,
    factory: &mut F,
) -> Result<NodeId> {
    let mut pass = CopyPass::new(source, factory);
    let copy = pass.copy_tree(root)?;
    let stats = pass.finish()?;
    info!(
        nodes = stats.nodes_copied,
        artifacts = stats.artifacts_copied,
        references = stats.references_copied,
        "copied tree"
    );
    Ok(copy)
}

/// Deep-copy the trees of several associations in one pass.
///
/// Artifacts shared between associations are copied once. Copies keep their
/// association id and presence condition; empty associations stay empty.
#[instrument(skip_all, fields(associations = associations.len()))]
pub fn deep_copy_associations<F: EntityFactory + ?Sized>(
    source: &Forest,
    associations: &[Association],
    factory: &mut F,
) -> Result<Vec<Association>> {
    let mut pass = CopyPass::new(source, factory);
    let mut copies = Vec::with_capacity(associations.len());

    for association in associations {
        let mut copy = Association::new(association.id())
            .with_presence_condition(association.presence_condition().clone());
        if let Some(root) = association.root() {
            let new_root = pass.copy_tree(root)?;
            pass.tag_root(new_root, association.id())?;
            copy.set_root(Some(new_root));
        }
        copies.push(copy);
    }

    let stats = pass.finish()?;
    info!(
        nodes = stats.nodes_copied,
        artifacts = stats.artifacts_copied,
        reused = stats.artifacts_reused,
        "copied associations"
    );
    Ok(copies)
}

/// Value-copy features with all their versions.
pub fn deep_copy_features<F: EntityFactory + ?Sized>(
    features: &[Feature],
    factory: &mut F,
) -> Result<Vec<Feature>> {
    let mut copies = Vec::with_capacity(features.len());
    for feature in features {
        let mut copy = factory.create_feature(feature.id(), feature.name())?;
        copy.set_description(feature.description());

        for version in feature.versions() {
            copy.add_version(version.id())
                .set_description(version.description());
        }
        copies.push(copy);
    }
    Ok(copies)
}
