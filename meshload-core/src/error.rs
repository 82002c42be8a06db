//! Error types for mesh loading, repair and export

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type MeshResult<T> = Result<T, MeshError>;

/// Which pooled buffer of a [`MeshStore`](crate::MeshStore) an allocation failure hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertices,
    Normals,
    Indices,
    Colors,
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BufferKind::Vertices => "vertex",
            BufferKind::Normals => "normal",
            BufferKind::Indices => "index",
            BufferKind::Colors => "color",
        };
        f.write_str(name)
    }
}

/// Errors reported by loaders, writers and the normal calculator.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Rejected before any I/O: empty path, bad format token, too little geometry to write.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The file is missing, unreadable or truncated before any geometry.
    #[error("i/o failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unrecognized suffix or implausible file contents.
    #[error("format error: {0}")]
    FormatError(String),

    /// A buffer could not grow; its length and capacity were reset to zero.
    #[error("failed to grow {buffer} buffer to {requested} elements")]
    AllocationFailure { buffer: BufferKind, requested: usize },

    /// Not enough usable geometry for the requested operation.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
}

impl MeshError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoFailure {
            path: path.into(),
            source,
        }
    }
}
