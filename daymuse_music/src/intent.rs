// The music intent: time-varying control curves derived from the day's
// semantic features.
//
// `build_intent` is a pure mapping — identical features always yield
// bit-identical curves. The three curves (intensity, tension, density) are
// sampled uniformly over the piece's duration and stay in [0, 1]; the voice
// renderers in ensemble.rs read them at their own strides.

use serde::{Deserialize, Serialize};

use daymuse_semantics::features::{NarrativePhase, SemanticFeatures};

/// Default piece length in seconds.
pub const DEFAULT_DURATION_SECONDS: u32 = 75;

/// Default curve samples per second.
pub const DEFAULT_RESOLUTION: u32 = 8;

/// Overall tonal shading of the piece, from emotional valence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicColor {
    Bright,
    Dark,
    Ambiguous,
}

/// Macro-level motion shape of the piece, from the narrative phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionProfile {
    Drift,
    Rise,
    Wave,
    Collapse,
}

/// High-level musical forces derived from semantics. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicIntent {
    pub duration_seconds: u32,

    // Time-varying, each of length duration_seconds * resolution, in [0, 1].
    pub intensity_curve: Vec<f64>,
    pub tension_curve: Vec<f64>,
    pub density_curve: Vec<f64>,

    // Global.
    pub tempo_base: u32,
    pub harmonic_color: HarmonicColor,
    pub motion_profile: MotionProfile,
    /// [valence, arousal, tension], mirroring the emotion state.
    pub emotional_vector: [f64; 3],
}

/// Expand a feature set into the full intent.
///
/// `resolution` is curve samples per second; the curves have
/// `duration_seconds * resolution` entries over normalized time t in [0, 1].
pub fn build_intent(
    features: &SemanticFeatures,
    duration_seconds: u32,
    resolution: u32,
) -> MusicIntent {
    let samples = (duration_seconds * resolution) as usize;

    let base_energy = (0.4 * features.semantic_velocity
        + 0.3 * features.semantic_novelty
        + 0.3 * features.topic_entropy)
        .clamp(0.0, 1.0);

    let mut intensity_curve = Vec::with_capacity(samples);
    let mut tension_curve = Vec::with_capacity(samples);
    let mut density_curve = Vec::with_capacity(samples);

    for i in 0..samples {
        let t = if samples > 1 {
            i as f64 / (samples - 1) as f64
        } else {
            0.0
        };

        let intensity = match features.narrative_phase {
            // Linear ramp from 30% to full energy.
            NarrativePhase::BuildUp => base_energy * (0.3 + 0.7 * t),
            // Triangular peak at the midpoint.
            NarrativePhase::Climax => base_energy * (1.0 - (2.0 * t - 1.0).abs()),
            // Linear decay.
            NarrativePhase::Aftermath => base_energy * (1.0 - t),
            NarrativePhase::Stasis => base_energy,
        }
        .clamp(0.0, 1.0);

        let tension = (intensity + 0.4 * features.intra_day_dispersion).clamp(0.0, 1.0);
        let density = (0.3 + features.topic_entropy + 0.3 * intensity).clamp(0.0, 1.0);

        intensity_curve.push(intensity);
        tension_curve.push(tension);
        density_curve.push(density);
    }

    let harmonic_color = if features.emotion.valence < -0.2 {
        HarmonicColor::Dark
    } else if features.emotion.valence > 0.3 {
        HarmonicColor::Bright
    } else {
        HarmonicColor::Ambiguous
    };

    let motion_profile = match features.narrative_phase {
        NarrativePhase::BuildUp => MotionProfile::Rise,
        NarrativePhase::Climax => MotionProfile::Wave,
        NarrativePhase::Aftermath => MotionProfile::Collapse,
        NarrativePhase::Stasis => MotionProfile::Drift,
    };

    let tempo_base = (45.0 + 65.0 * features.emotion.arousal).round() as u32;

    MusicIntent {
        duration_seconds,
        intensity_curve,
        tension_curve,
        density_curve,
        tempo_base,
        harmonic_color,
        motion_profile,
        emotional_vector: [
            features.emotion.valence,
            features.emotion.arousal,
            features.emotion.tension,
        ],
    }
}
