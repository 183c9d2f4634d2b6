// Embedding vector math and daily aggregation.
//
// An embedding is a fixed-length f32 vector produced once per article by the
// external sentence-embedding model. The batch for one day is an ordered
// sequence of such vectors; this module validates it, reduces it to a single
// daily vector, and provides the cosine measures the feature extractor is
// built on.
//
// Cosine is computed in f64 regardless of the f32 storage: the feature
// signals downstream are differences of near-unit quantities and lose too
// much precision at f32.

use crate::error::SemanticsError;

/// A fixed-length article embedding. Dimension is set by the external model
/// (e.g. 768) and must be uniform within a batch.
pub type Embedding = Vec<f32>;

/// Validate a batch: non-empty, uniform dimensionality. Returns the dimension.
pub fn batch_dimension(batch: &[Embedding]) -> Result<usize, SemanticsError> {
    let first = batch.first().ok_or(SemanticsError::EmptyBatch)?;
    let dim = first.len();
    for vector in batch {
        if vector.len() != dim {
            return Err(SemanticsError::InconsistentDimension {
                expected: dim,
                got: vector.len(),
            });
        }
    }
    Ok(dim)
}

/// Cosine similarity in [-1, 1]. A zero-norm vector compares as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Cosine distance in [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Reduce a day's batch to one daily embedding.
///
/// With no weights this is the arithmetic mean. With weights it is the
/// weighted mean; weights must align with the batch, be non-negative, and
/// not all be zero.
pub fn aggregate(
    batch: &[Embedding],
    weights: Option<&[f32]>,
) -> Result<Embedding, SemanticsError> {
    let dim = batch_dimension(batch)?;

    let mut daily = vec![0.0f64; dim];
    let total_weight = match weights {
        None => {
            for vector in batch {
                for (acc, &x) in daily.iter_mut().zip(vector) {
                    *acc += x as f64;
                }
            }
            batch.len() as f64
        }
        Some(weights) => {
            if weights.len() != batch.len() {
                return Err(SemanticsError::WeightMismatch {
                    expected: batch.len(),
                    got: weights.len(),
                });
            }
            let total: f64 = weights.iter().map(|&w| w as f64).sum();
            if total <= 0.0 {
                return Err(SemanticsError::ZeroWeight);
            }
            for (vector, &w) in batch.iter().zip(weights) {
                for (acc, &x) in daily.iter_mut().zip(vector) {
                    *acc += x as f64 * w as f64;
                }
            }
            total
        }
    };

    Ok(daily.into_iter().map(|x| (x / total_weight) as f32).collect())
}

/// Component-wise mean of a set of daily embeddings (the rolling mean).
/// Returns None for an empty set; the caller treats that as "no history".
pub fn mean_embedding(vectors: &[Embedding]) -> Option<Embedding> {
    let first = vectors.first()?;
    let mut mean = vec![0.0f64; first.len()];
    for vector in vectors {
        for (acc, &x) in mean.iter_mut().zip(vector) {
            *acc += x as f64;
        }
    }
    let n = vectors.len() as f64;
    Some(mean.into_iter().map(|x| (x / n) as f32).collect())
}
