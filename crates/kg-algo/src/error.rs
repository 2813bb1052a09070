//! Errors shared across the graph algorithms.

use thiserror::Error;

/// Errors an algorithm can raise.
#[derive(Debug, Error)]
pub enum AlgoError {
    /// A weight extractor produced `NaN` or infinity.
    #[error("edge weight must be finite, got {0}")]
    NonFiniteWeight(f64),
    /// `wouldCreateCycle` found the proposed edge does create one.
    #[error("adding this edge would create a cycle")]
    WouldCreateCycle,
    /// A traversal bound (max depth, max nodes explored, max weight) was
    /// reached before the algorithm finished.
    #[error("limit reached before the traversal completed: {0}")]
    LimitReached(&'static str),
}
