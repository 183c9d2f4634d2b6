// Emotion tracking: a slow-moving valence/arousal/tension estimate.
//
// The raw estimate for a day is derived from the daily embedding and the
// day's velocity/novelty signals. It is then exponentially smoothed against
// yesterday's persisted state, biased 70% toward yesterday, so the generated
// music does not whiplash day to day.

use serde::{Deserialize, Serialize};

/// Smoothing factor: weight given to yesterday's state.
pub const SMOOTHING_ALPHA: f64 = 0.7;

/// Continuous emotional state derived from semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    /// Sad to happy, in [-1, 1].
    pub valence: f64,
    /// Calm to energetic, in [0, 1].
    pub arousal: f64,
    /// Stable to anxious, in [0, 1].
    pub tension: f64,
}

impl EmotionState {
    /// A fully neutral state.
    pub fn neutral() -> Self {
        EmotionState {
            valence: 0.0,
            arousal: 0.0,
            tension: 0.0,
        }
    }

    /// Clamp every component to its documented range.
    pub fn clamped(self) -> Self {
        EmotionState {
            valence: self.valence.clamp(-1.0, 1.0),
            arousal: self.arousal.clamp(0.0, 1.0),
            tension: self.tension.clamp(0.0, 1.0),
        }
    }
}

/// Today's raw (unsmoothed) emotion estimate.
///
/// Valence maps the unbounded mean embedding component through tanh into
/// (-1, 1); arousal and tension scale the day's motion signals.
pub fn raw_emotion(daily_embedding: &[f32], velocity: f64, novelty: f64) -> EmotionState {
    let mean = if daily_embedding.is_empty() {
        0.0
    } else {
        daily_embedding.iter().map(|&x| x as f64).sum::<f64>() / daily_embedding.len() as f64
    };
    EmotionState {
        valence: mean.tanh(),
        arousal: (velocity * 1.5).min(1.0),
        tension: (0.5 * novelty + 0.5 * velocity).min(1.0),
    }
    .clamped()
}

/// One-pole exponential smoothing of `raw` against `previous`.
///
/// With no previous state the smoothed state equals the raw state: day one
/// starts without a discontinuity.
pub fn smooth_emotion(
    raw: EmotionState,
    previous: Option<&EmotionState>,
    alpha: f64,
) -> EmotionState {
    match previous {
        None => raw,
        Some(prev) => EmotionState {
            valence: alpha * prev.valence + (1.0 - alpha) * raw.valence,
            arousal: alpha * prev.arousal + (1.0 - alpha) * raw.arousal,
            tension: alpha * prev.tension + (1.0 - alpha) * raw.tension,
        }
        .clamped(),
    }
}

/// Compute today's emotion and smoothly update from yesterday.
pub fn update_emotion(
    daily_embedding: &[f32],
    velocity: f64,
    novelty: f64,
    yesterday: Option<&EmotionState>,
) -> EmotionState {
    smooth_emotion(
        raw_emotion(daily_embedding, velocity, novelty),
        yesterday,
        SMOOTHING_ALPHA,
    )
}
