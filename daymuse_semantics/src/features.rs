// The semantic feature extractor and narrative phase classifier.
//
// Takes today's embedding batch, today's daily vector, and whatever rolling
// history survives on disk, and produces the scalar feature set the intent
// builder consumes. All normalized features are clamped to their documented
// ranges; every history-dependent signal falls back to zero when history is
// absent so that a cold start classifies as stasis with neutral emotion.

use serde::{Deserialize, Serialize};

use crate::cluster::{cluster_counts, cluster_topics, normalized_entropy};
use crate::embedding::{
    Embedding, batch_dimension, cosine_distance, cosine_similarity, mean_embedding,
};
use crate::emotion::{EmotionState, update_emotion};
use crate::error::SemanticsError;

/// Default number of topic clusters requested per day.
pub const DEFAULT_NUM_CLUSTERS: usize = 4;

/// Coarse label for the day's semantic momentum and topic diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativePhase {
    BuildUp,
    Climax,
    Aftermath,
    Stasis,
}

impl NarrativePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            NarrativePhase::BuildUp => "build_up",
            NarrativePhase::Climax => "climax",
            NarrativePhase::Aftermath => "aftermath",
            NarrativePhase::Stasis => "stasis",
        }
    }
}

/// The per-day feature set. Created once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFeatures {
    /// Distance of today from the rolling norm, in [0, 1].
    pub semantic_shift: f64,
    /// 90th-percentile cosine distance to the rolling history, in [0, 2].
    pub semantic_novelty: f64,
    /// Number of non-empty topic clusters actually produced.
    pub num_topics: usize,
    /// Largest cluster's share of the batch, in (0, 1].
    pub topic_dominance: f64,
    /// Normalized Shannon entropy of cluster sizes, in [0, 1].
    pub topic_entropy: f64,
    /// Day-over-day motion of the daily embedding, in [0, 2].
    pub semantic_velocity: f64,
    /// Change in velocity since yesterday, in [-2, 2].
    pub semantic_acceleration: f64,
    /// Mean pairwise cosine distance within today's batch, in [0, 2].
    pub intra_day_dispersion: f64,
    pub narrative_phase: NarrativePhase,
    pub emotion: EmotionState,
}

/// Classify the day's narrative phase from its motion statistics.
///
/// Priority-ordered rules, first match wins. The ordering is a deliberate
/// tie-break: a day that is both fast-moving and highly fragmented reads as
/// climax even when it also satisfies the build-up acceleration test.
pub fn classify_narrative_phase(
    velocity: f64,
    acceleration: f64,
    entropy: f64,
) -> NarrativePhase {
    if velocity > 0.6 && entropy > 0.6 {
        return NarrativePhase::Climax;
    }
    if acceleration > 0.2 {
        return NarrativePhase::BuildUp;
    }
    if velocity < 0.3 && entropy < 0.4 {
        return NarrativePhase::Aftermath;
    }
    NarrativePhase::Stasis
}

/// 90th percentile with linear interpolation between adjacent ranks.
fn percentile_90(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = 0.9 * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

fn semantic_shift(daily: &Embedding, rolling_mean: Option<&Embedding>) -> f64 {
    match rolling_mean {
        None => 0.0,
        Some(mean) => (1.0 - cosine_similarity(daily, mean)).clamp(0.0, 1.0),
    }
}

fn semantic_novelty(daily: &Embedding, history: &[Embedding]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let mut distances: Vec<f64> = history
        .iter()
        .map(|past| cosine_distance(daily, past))
        .collect();
    percentile_90(&mut distances).clamp(0.0, 2.0)
}

fn intra_day_dispersion(batch: &[Embedding]) -> f64 {
    if batch.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..batch.len() {
        for j in (i + 1)..batch.len() {
            total += cosine_distance(&batch[i], &batch[j]);
            pairs += 1;
        }
    }
    (total / pairs as f64).clamp(0.0, 2.0)
}

/// Extract the full feature set for one day.
///
/// `history` is the rolling window of previous daily embeddings (most recent
/// first or last, order does not matter); `yesterday_*` are the persisted
/// continuity values, each optional with a zero/identity fallback.
#[allow(clippy::too_many_arguments)]
pub fn extract_features(
    batch: &[Embedding],
    daily: &Embedding,
    history: &[Embedding],
    yesterday_embedding: Option<&Embedding>,
    yesterday_velocity: Option<f64>,
    yesterday_emotion: Option<&EmotionState>,
    num_clusters: usize,
) -> Result<SemanticFeatures, SemanticsError> {
    let dim = batch_dimension(batch)?;
    for past in history.iter().chain(yesterday_embedding) {
        if past.len() != dim {
            return Err(SemanticsError::InconsistentDimension {
                expected: dim,
                got: past.len(),
            });
        }
    }

    let rolling_mean = mean_embedding(history);
    let shift = semantic_shift(daily, rolling_mean.as_ref());
    let novelty = semantic_novelty(daily, history);

    let labels = cluster_topics(batch, num_clusters);
    let counts = cluster_counts(&labels);
    let num_topics = counts.iter().filter(|&&c| c > 0).count();
    let topic_dominance =
        counts.iter().max().copied().unwrap_or(0) as f64 / batch.len() as f64;
    let topic_entropy = normalized_entropy(&counts);

    let dispersion = intra_day_dispersion(batch);

    let velocity = match yesterday_embedding {
        None => 0.0,
        Some(past) => cosine_distance(daily, past).clamp(0.0, 2.0),
    };
    let acceleration = match yesterday_velocity {
        None => 0.0,
        Some(past) => (velocity - past).clamp(-2.0, 2.0),
    };

    let narrative_phase = classify_narrative_phase(velocity, acceleration, topic_entropy);
    let emotion = update_emotion(daily, velocity, novelty, yesterday_emotion);

    Ok(SemanticFeatures {
        semantic_shift: shift,
        semantic_novelty: novelty,
        num_topics,
        topic_dominance,
        topic_entropy,
        semantic_velocity: velocity,
        semantic_acceleration: acceleration,
        intra_day_dispersion: dispersion,
        narrative_phase,
        emotion,
    })
}
