//! Sequence-graph trimming.
//!
//! When associations drop out of the retained set, every ordered artifact
//! reachable from the remaining ones forgets the symbols and orderings only
//! the dropped associations justified.

use crate::association::{Association, AssociationId, association_ids};
use crate::error::Result;
use crate::sequence::Symbol;
use crate::tree::{Forest, NodeId};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Statistics from one trim pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimStats {
    pub graphs_trimmed: usize,
    pub symbols_removed: usize,
}

/// Trim every sequence graph below the roots of `associations` to what those
/// associations still justify.
#[instrument(skip_all, fields(associations = associations.len()))]
pub fn trim_sequence_graphs(
    forest: &mut Forest,
    associations: &[Association],
) -> Result<TrimStats> {
    let keep = association_ids(associations);
    let mut stats = TrimStats::default();

    for association in associations {
        if let Some(root) = association.root() {
            trim_node(forest, root, &keep, &mut stats)?;
        }
    }

    debug!(
        graphs = stats.graphs_trimmed,
        symbols = stats.symbols_removed,
        "trimmed sequence graphs"
    );
    Ok(stats)
}

fn trim_node(
    forest: &mut Forest,
    node: NodeId,
    keep: &BTreeSet<AssociationId>,
    stats: &mut TrimStats,
) -> Result<()> {
    let (unique, artifact, children) = {
        let n = forest.node(node)?;
        (n.is_unique(), n.artifact(), n.children().to_vec())
    };

    if unique
        && let Some(artifact) = artifact
        && forest.artifact(artifact)?.sequence_graph().is_some()
    {
        let retained = retained_symbols(forest, artifact, keep)?;
        if let Some(graph) = forest.artifact_mut(artifact)?.sequence_graph_mut() {
            let before = graph.symbols().len();
            graph.trim(&retained);
            graph.retain_associations(keep);
            stats.graphs_trimmed += 1;
            stats.symbols_removed += before - graph.symbols().len();
        }
    }

    // Non-unique subtrees may still hold unique descendants.
    for child in children {
        trim_node(forest, child, keep, stats)?;
    }
    Ok(())
}

fn retained_symbols(
    forest: &Forest,
    artifact: Symbol,
    keep: &BTreeSet<AssociationId>,
) -> Result<BTreeSet<Symbol>> {
    let Some(graph) = forest.artifact(artifact)?.sequence_graph() else {
        return Ok(BTreeSet::new());
    };

    let mut retained = BTreeSet::new();
    for &symbol in graph.symbols() {
        let kept = match forest.artifact(symbol)?.containing_node() {
            Some(node) => forest
                .containing_association(node)?
                .is_some_and(|id| keep.contains(&id)),
            None => graph
                .contributors(symbol)
                .iter()
                .any(|id| keep.contains(id)),
        };
        if kept {
            retained.insert(symbol);
        }
    }
    Ok(retained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LineArtifactData;
    use crate::factory::{EntityFactory, MemEntityFactory};
    use crate::tree::ArtifactId;
    use std::sync::Arc;

    /// Ordered artifact X whose three children each come from their own association.
    struct Fixture {
        factory: MemEntityFactory,
        x: ArtifactId,
        children: Vec<ArtifactId>,
        associations: Vec<Association>,
    }

    fn fixture() -> Fixture {
        let mut factory = MemEntityFactory::new();
        let x_node = factory
            .create_ordered_node_with_data(Arc::new(LineArtifactData::new("X")))
            .unwrap();
        let x = factory.forest().node(x_node).unwrap().artifact().unwrap();
        let mut associations = vec![factory.create_association_from(&[x_node]).unwrap()];

        let mut children = Vec::new();
        for name in ["a", "b", "c"] {
            let node = factory
                .create_node_with_data(Arc::new(LineArtifactData::new(name)))
                .unwrap();
            children.push(factory.forest().node(node).unwrap().artifact().unwrap());
            associations.push(factory.create_association_from(&[node]).unwrap());
        }

        let (a, b, c) = (children[0], children[1], children[2]);
        let ids: Vec<_> = associations.iter().map(Association::id).collect();
        let graph = factory
            .forest_mut()
            .artifact_mut(x)
            .unwrap()
            .sequence_graph_mut()
            .unwrap();
        graph.learn(&[a], ids[1]).unwrap();
        graph.learn(&[a, b], ids[2]).unwrap();
        graph.learn(&[c, a, b], ids[3]).unwrap();

        Fixture {
            factory,
            x,
            children,
            associations,
        }
    }

    #[test]
    fn test_trim_to_subset() {
        let Fixture {
            mut factory,
            x,
            children,
            associations,
        } = fixture();
        let (a, b, c) = (children[0], children[1], children[2]);

        let stats = trim_sequence_graphs(factory.forest_mut(), &associations[..3]).unwrap();

        assert_eq!(stats.graphs_trimmed, 1);
        assert_eq!(stats.symbols_removed, 1);
        let graph = factory.forest().artifact(x).unwrap().sequence_graph().unwrap();
        assert_eq!(graph.symbols(), &BTreeSet::from([a, b]));
        assert!(graph.accepts(&[a]));
        assert!(graph.accepts(&[a, b]));
        assert!(!graph.accepts(&[c, a, b]));
    }

    #[test]
    fn test_trim_to_nothing() {
        let Fixture {
            mut factory,
            x,
            associations,
            ..
        } = fixture();

        // X's own association contributes none of the children.
        trim_sequence_graphs(factory.forest_mut(), &associations[..1]).unwrap();

        let graph = factory.forest().artifact(x).unwrap().sequence_graph().unwrap();
        assert!(graph.symbols().is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_shared_symbol_kept_by_any_contributor() {
        let mut factory = MemEntityFactory::new();
        let x_node = factory
            .create_ordered_node_with_data(Arc::new(LineArtifactData::new("X")))
            .unwrap();
        let shared = factory
            .create_artifact(Arc::new(LineArtifactData::new("s")))
            .unwrap();
        let x = factory.forest().node(x_node).unwrap().artifact().unwrap();
        let kept = factory.create_association_from(&[x_node]).unwrap();
        let dropped = AssociationId::new(42);

        let graph = factory
            .forest_mut()
            .artifact_mut(x)
            .unwrap()
            .sequence_graph_mut()
            .unwrap();
        graph.learn(&[shared], kept.id()).unwrap();
        graph.learn(&[shared], dropped).unwrap();

        trim_sequence_graphs(factory.forest_mut(), &[kept]).unwrap();

        let graph = factory.forest().artifact(x).unwrap().sequence_graph().unwrap();
        assert!(graph.accepts(&[shared]));
        assert_eq!(graph.contributors(shared).len(), 1);
    }

    #[test]
    fn test_non_unique_holder_skipped_but_descended() {
        let mut factory = MemEntityFactory::new();
        let outer = factory
            .create_ordered_node_with_data(Arc::new(LineArtifactData::new("outer")))
            .unwrap();
        factory.forest_mut().node_mut(outer).unwrap().set_unique(false);
        let inner = factory
            .create_ordered_node_with_data(Arc::new(LineArtifactData::new("inner")))
            .unwrap();
        factory.forest_mut().add_child(outer, inner).unwrap();
        let association = factory.create_association_from(&[outer]).unwrap();

        let stats = trim_sequence_graphs(factory.forest_mut(), &[association]).unwrap();
        assert_eq!(stats.graphs_trimmed, 1);
    }

    #[test]
    fn test_copy_then_trim_scenario() {
        use crate::copy::deep_copy_associations;

        let mut source = MemEntityFactory::new();
        let x_node = source
            .create_ordered_node_with_data(Arc::new(LineArtifactData::new("X")))
            .unwrap();
        let a_node = source
            .create_node_with_data(Arc::new(LineArtifactData::new("1")))
            .unwrap();
        let b_node = source
            .create_node_with_data(Arc::new(LineArtifactData::new("2")))
            .unwrap();
        source.forest_mut().add_child(x_node, a_node).unwrap();
        source.forest_mut().add_child(x_node, b_node).unwrap();
        let a1 = source.create_association_from(&[x_node]).unwrap();
        let a2 = source.create_association().unwrap();

        let x = source.forest().node(x_node).unwrap().artifact().unwrap();
        let a = source.forest().node(a_node).unwrap().artifact().unwrap();
        let b = source.forest().node(b_node).unwrap().artifact().unwrap();
        {
            let graph = source
                .forest_mut()
                .artifact_mut(x)
                .unwrap()
                .sequence_graph_mut()
                .unwrap();
            graph.learn(&[a, b], a1.id()).unwrap();
            graph.learn(&[b, a], a2.id()).unwrap();
        }
        let source = source.into_forest();

        let mut target = MemEntityFactory::new();
        let copies = deep_copy_associations(&source, &[a1, a2], &mut target).unwrap();

        let forest = target.forest_mut();
        let x_copy = forest.node(copies[0].root().unwrap()).unwrap().children()[0];
        let x_artifact = forest.node(x_copy).unwrap().artifact().unwrap();
        let children = forest.node(x_copy).unwrap().children().to_vec();
        let ta = forest.node(children[0]).unwrap().artifact().unwrap();
        let tb = forest.node(children[1]).unwrap().artifact().unwrap();
        {
            let graph = forest.artifact(x_artifact).unwrap().sequence_graph().unwrap();
            assert!(graph.accepts(&[ta, tb]));
            assert!(graph.accepts(&[tb, ta]));
        }

        trim_sequence_graphs(forest, &copies[..1]).unwrap();

        let graph = forest.artifact(x_artifact).unwrap().sequence_graph().unwrap();
        assert_eq!(graph.orderings(), vec![vec![ta, tb]]);
    }
}
