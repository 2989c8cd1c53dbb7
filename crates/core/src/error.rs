//! Error types for kcpjoin partitioning and closest-pairs queries.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Primary error type for partition construction, persistence and joins.
#[derive(Error, Debug)]
pub enum JoinError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("partition split picked vertex {vertex} as both seeds")]
    SeedCollision { vertex: NodeId },

    #[error("malformed {}:{line}: {msg}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("partition files not found at {}", .0.display())]
    MissingPartition(PathBuf),

    #[error("node {0} has no coordinates")]
    UnknownNode(NodeId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool error: {0}")]
    ThreadPool(String),

    #[error("query incomplete: deadline expired with {found} of {k} pairs")]
    Incomplete { found: usize, k: usize },
}

impl JoinError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, msg: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            msg: msg.into(),
        }
    }
}

/// Convenience Result type alias for JoinError.
pub type Result<T> = std::result::Result<T, JoinError>;
