use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RefineError>;

#[derive(Debug, Error)]
pub enum RefineError {
    /// A bin table or path entry names a contig the contig table does not know.
    #[error("unknown contig '{name}'")]
    UnknownContig { name: String },

    #[error("bin index {bin} out of range for {n_bins} bins")]
    UnknownBin { bin: usize, n_bins: usize },

    #[error("edge ({u}, {v}) references a vertex outside 0..{n_vertices}")]
    EdgeOutOfRange { u: usize, v: usize, n_vertices: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal state no longer matches what the refinement stages rely on.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("{stage} did not converge within {cap} passes")]
    IterationLimit { stage: &'static str, cap: usize },

    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl RefineError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        RefineError::Invariant(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RefineError::Config(msg.into())
    }
}
