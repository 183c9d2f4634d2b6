// Standalone solo-piano generator with a motif engine.
//
// Where the ensemble reads the intent curves directly, the solo generator
// works phrase by phrase: it builds a short melodic motif as a constrained
// walk over a diatonic scale, then evolves it between phrases — inversion
// while the macro arc rises, stretching while it falls, and occasional full
// regeneration otherwise. A left-hand harmony routine drops sustained chords
// under the melody, thickened as energy and dissonance grow.
//
// The scalar knobs (register, variation, dissonance, energy, arc) are
// derived from the day's SemanticFeatures here; they are an implementation
// detail of this voice, not part of the MusicIntent contract.

use rand::Rng;
use rand::rngs::StdRng;

use daymuse_semantics::features::{NarrativePhase, SemanticFeatures};

use crate::ensemble::{Note, Score, VoiceTrack};

/// C major starting at middle C.
const C_MAJOR: [i32; 7] = [60, 62, 64, 65, 67, 69, 71];
/// A natural minor below middle C.
const A_MINOR: [i32; 7] = [57, 59, 60, 62, 64, 65, 67];

/// Notes per generated motif.
const MOTIF_LENGTH: usize = 8;

/// Named pitch-range preset for the melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Low,
    Mid,
    High,
}

impl Register {
    /// Base range in MIDI pitch, before energy expansion.
    fn base_range(self) -> (i32, i32) {
        match self {
            Register::Low => (36, 52),  // C2-E3
            Register::Mid => (48, 72),  // C3-C5
            Register::High => (60, 84), // C4-C6
        }
    }
}

/// Macro arc of the piece, steering motif evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseArc {
    Rise,
    Fall,
    Wave,
}

/// Scalar knobs for the solo voice, derived from the day's features.
#[derive(Debug, Clone)]
pub struct SoloParams {
    pub scale: Vec<i32>,
    pub register: Register,
    pub tempo: u32,
    pub density: f64,
    pub dissonance: f64,
    pub variation: f64,
    pub energy: f64,
    pub arc: PhraseArc,
}

impl SoloParams {
    pub fn from_features(features: &SemanticFeatures) -> Self {
        let scale = if features.semantic_shift > 0.4 {
            A_MINOR.to_vec()
        } else {
            C_MAJOR.to_vec()
        };

        let register = if features.semantic_novelty > 0.7 {
            Register::High
        } else if features.semantic_shift > 0.5 {
            Register::Low
        } else {
            Register::Mid
        };

        let tempo = (55.0 + features.semantic_velocity * 55.0).clamp(40.0, 110.0) as u32;

        SoloParams {
            scale,
            register,
            tempo,
            density: (0.3 + features.topic_entropy).min(1.0),
            dissonance: features.intra_day_dispersion.min(1.0),
            variation: features.semantic_novelty.clamp(0.0, 1.0),
            energy: (0.5 * features.semantic_velocity
                + 0.3 * features.semantic_novelty
                + 0.2 * features.topic_entropy)
                .min(1.0),
            arc: match features.narrative_phase {
                NarrativePhase::BuildUp => PhraseArc::Rise,
                NarrativePhase::Climax => PhraseArc::Wave,
                _ => PhraseArc::Fall,
            },
        }
    }
}

/// Expand a register outward by up to an octave, proportionally to energy.
fn expand_register(base: (i32, i32), energy: f64) -> (i32, i32) {
    let expansion = (12.0 * energy) as i32;
    (base.0 - expansion, base.1 + expansion)
}

/// Restrict a scale to a register; an emptied scale falls back to the full
/// unrestricted scale rather than failing.
fn restrict_scale(scale: &[i32], range: (i32, i32)) -> Vec<i32> {
    let restricted: Vec<i32> = scale
        .iter()
        .copied()
        .filter(|&p| range.0 <= p && p <= range.1)
        .collect();
    if restricted.is_empty() {
        scale.to_vec()
    } else {
        restricted
    }
}

/// Index of the scale degree nearest to `pitch` (first wins on ties).
fn nearest_degree(scale: &[i32], pitch: i32) -> usize {
    let mut best = 0;
    let mut best_dist = i32::MAX;
    for (i, &p) in scale.iter().enumerate() {
        let dist = (p - pitch).abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// A fixed-length walk over the scale. Step size is drawn from small
/// seconds/thirds and doubled with probability `variation`, so novel days
/// leap more.
fn generate_motif(scale: &[i32], length: usize, variation: f64, rng: &mut StdRng) -> Vec<i32> {
    let mut motif = Vec::with_capacity(length);
    let mut current = scale[rng.random_range(0..scale.len())];

    for _ in 0..length {
        let mut step = [-2i32, -1, 1, 2][rng.random_range(0..4)];
        if rng.random::<f64>() < variation {
            step *= [1, 2][rng.random_range(0..2)];
        }
        let idx = nearest_degree(scale, current) as i32 + step;
        let idx = idx.clamp(0, scale.len() as i32 - 1) as usize;
        current = scale[idx];
        motif.push(current);
    }
    motif
}

/// Reflect every pitch around `center`.
fn invert_motif(motif: &[i32], center: i32) -> Vec<i32> {
    motif.iter().map(|&n| 2 * center - n).collect()
}

/// Keep every `factor`-th note, lengthening the phrase feel.
fn stretch_motif(motif: &[i32], factor: usize) -> Vec<i32> {
    motif.iter().copied().step_by(factor.max(1)).collect()
}

/// Randomly detune a scale-degree note by a semitone.
fn apply_dissonance(note: i32, amount: f64, rng: &mut StdRng) -> i32 {
    if rng.random::<f64>() < amount {
        note + if rng.random_bool(0.5) { 1 } else { -1 }
    } else {
        note
    }
}

/// Arched phrase dynamics: loudest mid-phrase, scaled by energy.
fn phrase_velocity(step: usize, total: usize, energy: f64) -> u8 {
    let arch = ((step as f64 / total as f64) - 0.5).abs() * 2.0;
    (50.0 + (1.0 - arch) * 50.0 * energy).clamp(0.0, 127.0) as u8
}

fn clamp_pitch(pitch: i32) -> u8 {
    pitch.clamp(0, 127) as u8
}

/// Left-hand chord: root an octave down plus a fifth, with an added ninth
/// when energy is high and a semitone cluster when dissonance is high.
fn add_left_hand(
    notes: &mut Vec<Note>,
    root: i32,
    start: f64,
    duration: f64,
    energy: f64,
    dissonance: f64,
) {
    let mut chord = vec![root - 12, root - 5];
    if energy > 0.5 {
        chord.push(root + 2);
    }
    if dissonance > 0.6 {
        chord.push(root - 11);
    }
    let velocity = (40.0 + energy * 50.0).clamp(0.0, 127.0) as u8;
    for pitch in chord {
        notes.push(Note {
            pitch: clamp_pitch(pitch),
            velocity,
            start,
            end: start + duration,
        });
    }
}

/// Generate a single-instrument solo piano score from the day's features.
///
/// Deterministic for a fixed seed: every random decision draws from `rng`.
pub fn generate_solo(
    features: &SemanticFeatures,
    duration_seconds: u32,
    rng: &mut StdRng,
) -> Score {
    let params = SoloParams::from_features(features);
    let range = expand_register(params.register.base_range(), params.energy);
    let scale = restrict_scale(&params.scale, range);

    let seconds_per_beat = 60.0 / params.tempo as f64;
    let note_duration = seconds_per_beat * 0.9;
    let chord_duration = seconds_per_beat * 4.0;
    let duration = duration_seconds as f64;

    let mut notes = Vec::new();
    let mut motif = generate_motif(&scale, MOTIF_LENGTH, params.variation, rng);
    let mut time = 0.0;
    let mut next_chord_time = 0.0;

    while time < duration {
        // Left hand: gated by density, spaced by the chord sustain window.
        if time >= next_chord_time && rng.random::<f64>() < params.density {
            let root = scale[rng.random_range(0..scale.len())];
            add_left_hand(
                &mut notes,
                root,
                time,
                chord_duration,
                params.energy,
                params.dissonance,
            );
            next_chord_time = time + chord_duration;
        }

        // Right hand: one pass through the motif.
        for (i, &degree) in motif.iter().enumerate() {
            if time >= duration {
                break;
            }
            if rng.random::<f64>() > params.density {
                time += note_duration;
                continue;
            }
            let pitch = apply_dissonance(degree, params.dissonance, rng);
            notes.push(Note {
                pitch: clamp_pitch(pitch),
                velocity: phrase_velocity(i, motif.len(), params.energy),
                start: time,
                end: time + note_duration,
            });
            time += note_duration;
        }

        // Motif evolution between phrases.
        motif = match params.arc {
            PhraseArc::Rise => invert_motif(&motif, motif[0]),
            PhraseArc::Fall => stretch_motif(&motif, 2),
            PhraseArc::Wave => {
                if rng.random::<f64>() < params.variation {
                    generate_motif(&scale, MOTIF_LENGTH, params.variation, rng)
                } else {
                    motif
                }
            }
        };
    }

    Score {
        tempo_bpm: params.tempo,
        tracks: vec![VoiceTrack {
            name: "Solo Piano",
            program: 0,
            is_drum: false,
            notes,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daymuse_semantics::EmotionState;
    use rand::SeedableRng;

    fn features(
        shift: f64,
        novelty: f64,
        velocity: f64,
        entropy: f64,
        dispersion: f64,
        phase: NarrativePhase,
    ) -> SemanticFeatures {
        SemanticFeatures {
            semantic_shift: shift,
            semantic_novelty: novelty,
            num_topics: 3,
            topic_dominance: 0.5,
            topic_entropy: entropy,
            semantic_velocity: velocity,
            semantic_acceleration: 0.0,
            intra_day_dispersion: dispersion,
            narrative_phase: phase,
            emotion: EmotionState::neutral(),
        }
    }

    #[test]
    fn params_pick_register_and_scale_from_features() {
        let high = SoloParams::from_features(&features(
            0.1,
            0.9,
            0.2,
            0.5,
            0.2,
            NarrativePhase::Stasis,
        ));
        assert_eq!(high.register, Register::High);
        assert_eq!(high.scale, C_MAJOR.to_vec());

        let low = SoloParams::from_features(&features(
            0.6,
            0.1,
            0.2,
            0.5,
            0.2,
            NarrativePhase::Stasis,
        ));
        assert_eq!(low.register, Register::Low);
        assert_eq!(low.scale, A_MINOR.to_vec());
    }

    #[test]
    fn tempo_is_clamped_to_40_110() {
        let fast = SoloParams::from_features(&features(
            0.0,
            0.0,
            2.0,
            0.0,
            0.0,
            NarrativePhase::Stasis,
        ));
        assert_eq!(fast.tempo, 110);
        let slow = SoloParams::from_features(&features(
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            NarrativePhase::Stasis,
        ));
        assert_eq!(slow.tempo, 55);
    }

    #[test]
    fn register_expansion_scales_with_energy() {
        assert_eq!(expand_register((48, 72), 0.0), (48, 72));
        assert_eq!(expand_register((48, 72), 1.0), (36, 84));
    }

    #[test]
    fn empty_register_restriction_falls_back_to_full_scale() {
        // A range far below the scale empties the restriction.
        let restricted = restrict_scale(&C_MAJOR, (0, 10));
        assert_eq!(restricted, C_MAJOR.to_vec());

        let partial = restrict_scale(&C_MAJOR, (60, 65));
        assert_eq!(partial, vec![60, 62, 64, 65]);
    }

    #[test]
    fn motif_walks_the_scale() {
        let mut rng = StdRng::seed_from_u64(4);
        let motif = generate_motif(&C_MAJOR, MOTIF_LENGTH, 0.5, &mut rng);
        assert_eq!(motif.len(), MOTIF_LENGTH);
        assert!(motif.iter().all(|p| C_MAJOR.contains(p)));
    }

    #[test]
    fn inversion_reflects_around_the_center() {
        assert_eq!(invert_motif(&[60, 64, 67], 60), vec![60, 56, 53]);
    }

    #[test]
    fn stretch_keeps_every_second_note() {
        assert_eq!(stretch_motif(&[1, 2, 3, 4, 5], 2), vec![1, 3, 5]);
        // A single note survives repeated stretching.
        assert_eq!(stretch_motif(&[7], 2), vec![7]);
    }

    #[test]
    fn zero_dissonance_never_detunes() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(apply_dissonance(60, 0.0, &mut rng), 60);
        }
    }

    #[test]
    fn full_dissonance_always_detunes_by_a_semitone() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let p = apply_dissonance(60, 1.0, &mut rng);
            assert!(p == 59 || p == 61);
        }
    }

    #[test]
    fn phrase_velocity_arches() {
        let edge = phrase_velocity(0, 8, 1.0);
        let mid = phrase_velocity(4, 8, 1.0);
        assert!(mid > edge);
        assert!(mid <= 127 && edge >= 50);
    }

    #[test]
    fn solo_is_deterministic_for_a_seed() {
        let f = features(0.3, 0.6, 0.5, 0.7, 0.4, NarrativePhase::Climax);
        let a = generate_solo(&f, 20, &mut StdRng::seed_from_u64(42));
        let b = generate_solo(&f, 20, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn solo_notes_are_valid_and_start_within_the_piece() {
        let f = features(0.3, 0.6, 0.5, 0.9, 0.8, NarrativePhase::BuildUp);
        let score = generate_solo(&f, 30, &mut StdRng::seed_from_u64(5));
        let track = &score.tracks[0];
        assert!(!track.notes.is_empty());
        for note in &track.notes {
            assert!(note.end > note.start);
            assert!(note.velocity <= 127);
            assert!(note.start < 30.0);
        }
    }

    #[test]
    fn falling_arc_still_terminates_with_a_shrunken_motif() {
        // Repeated stretching collapses the motif toward one note; the clock
        // must still advance to the end of the piece.
        let f = features(0.1, 0.1, 0.1, 0.9, 0.1, NarrativePhase::Aftermath);
        let score = generate_solo(&f, 15, &mut StdRng::seed_from_u64(1));
        assert!(!score.tracks[0].notes.is_empty());
    }
}
