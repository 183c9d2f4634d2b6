// Error taxonomy for the feature engine.
//
// Only malformed input is fatal. Missing history is never an error: each
// feature that depends on yesterday's state falls back to a neutral value
// instead, so day one of a deployment still composes.

use thiserror::Error;

/// Fatal input errors for feature extraction and aggregation.
#[derive(Debug, Error)]
pub enum SemanticsError {
    /// The embedding batch was empty where at least one article is required.
    /// The caller must special-case "no articles" upstream.
    #[error("empty embedding batch: at least one article is required")]
    EmptyBatch,

    /// Embedding vectors within one batch disagree on dimensionality.
    #[error("inconsistent embedding dimension: expected {expected}, got {got}")]
    InconsistentDimension { expected: usize, got: usize },

    /// Aggregation weights do not align with the batch.
    #[error("weights length {got} does not match batch size {expected}")]
    WeightMismatch { expected: usize, got: usize },

    /// All aggregation weights are zero, leaving the mean undefined.
    #[error("aggregation weights sum to zero")]
    ZeroWeight,
}
