//! Associations bind a presence condition to the subtree it contributes.

use crate::tree::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable association identifier.
///
/// Membership checks compare ids, never object identity, so an id stays valid
/// across copies and serialization boundaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssociationId(u64);

impl AssociationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssociationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Boolean-like formula over features. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresenceCondition {
    formula: String,
}

impl PresenceCondition {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
        }
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }
}

impl Default for PresenceCondition {
    fn default() -> Self {
        Self::new("true")
    }
}

impl fmt::Display for PresenceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formula)
    }
}

/// Link between a presence condition and the artifact tree it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    id: AssociationId,
    root: Option<NodeId>,
    presence_condition: PresenceCondition,
}

impl Association {
    /// Create an association without a tree.
    pub fn new(id: AssociationId) -> Self {
        Self {
            id,
            root: None,
            presence_condition: PresenceCondition::default(),
        }
    }

    pub fn with_root(mut self, root: NodeId) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_presence_condition(mut self, condition: PresenceCondition) -> Self {
        self.presence_condition = condition;
        self
    }

    pub fn id(&self) -> AssociationId {
        self.id
    }

    /// Root node of the contributed tree; `None` for an empty association.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    pub fn presence_condition(&self) -> &PresenceCondition {
        &self.presence_condition
    }

    pub fn set_presence_condition(&mut self, condition: PresenceCondition) {
        self.presence_condition = condition;
    }
}

/// Collect the ids of a set of associations.
pub fn association_ids<'a, I>(associations: I) -> BTreeSet<AssociationId>
where
    I: IntoIterator<Item = &'a Association>,
{
    associations.into_iter().map(Association::id).collect()
}
