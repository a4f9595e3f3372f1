//! Commit and remote records handed out by the creation boundary.

use crate::association::AssociationId;
use crate::feature::Configuration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a commit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CommitId(u64);

impl CommitId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A commit: the configuration that was committed and the associations it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    id: CommitId,
    configuration: Option<Configuration>,
    associations: Vec<AssociationId>,
}

impl Commit {
    /// Create an empty commit.
    pub fn new(id: CommitId) -> Self {
        Self {
            id,
            configuration: None,
            associations: Vec::new(),
        }
    }

    pub fn id(&self) -> CommitId {
        self.id
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    pub fn set_configuration(&mut self, configuration: Configuration) {
        self.configuration = Some(configuration);
    }

    pub fn associations(&self) -> &[AssociationId] {
        &self.associations
    }

    pub fn add_association(&mut self, association: AssociationId) {
        if !self.associations.contains(&association) {
            self.associations.push(association);
        }
    }
}

/// Whether a remote lives on this machine or elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteType {
    Local,
    Remote,
}

/// A named remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub address: String,
    pub remote_type: RemoteType,
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.remote_type {
            RemoteType::Local => "local",
            RemoteType::Remote => "remote",
        };
        write!(f, "{} -> {} ({})", self.name, self.address, kind)
    }
}
