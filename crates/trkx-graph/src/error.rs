//! Error types for trkx-graph.

use thiserror::Error;

/// Graph record error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Row count or feature width disagreement.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A field required by the operation is absent.
    #[error("missing graph field: {0}")]
    MissingField(&'static str),

    /// A sender or receiver points past the last node.
    #[error("{what} index {index} out of range for {bound} nodes")]
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        bound: usize,
    },

    /// Batching or concatenating an empty list.
    #[error("cannot combine an empty list of graphs")]
    EmptyBatch,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
