//! Error types for varepo_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using varepo_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, copying, trimming or exporting trees.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Content hash of a file could not be computed.
    #[error("Could not compute hash for {path}: {source}")]
    ContentHash {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Configuration file is malformed.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// An operation was called with arguments that violate its preconditions.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A node at the given depth carries an unexpected payload type.
    #[error("Wrong artifact data type at depth {depth}: expected {expected}, got {got}")]
    WrongArtifactDataType {
        depth: usize,
        expected: String,
        got: String,
    },

    /// Node id does not belong to the forest it was resolved against.
    #[error("Unknown node: {id}")]
    UnknownNode { id: String },

    /// Artifact id does not belong to the forest it was resolved against.
    #[error("Unknown artifact: {id}")]
    UnknownArtifact { id: String },
}

impl Error {
    /// Wrap a hashing failure with the path that was being hashed.
    pub fn content_hash(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::ContentHash {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a WrongArtifactDataType error.
    pub fn wrong_artifact_data_type(
        depth: usize,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Error::WrongArtifactDataType {
            depth,
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an UnknownNode error.
    pub fn unknown_node(id: impl ToString) -> Self {
        Error::UnknownNode { id: id.to_string() }
    }

    /// Create an UnknownArtifact error.
    pub fn unknown_artifact(id: impl ToString) -> Self {
        Error::UnknownArtifact { id: id.to_string() }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}
