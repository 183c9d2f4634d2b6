// The ensemble generator: four instrument voices driven by one MusicIntent.
//
// Each voice is an independent state machine reading the shared intent
// curves at its own sampling stride and emitting timed notes. The closed
// voice set (percussion, bass, strings, piano) sits behind one trait; no
// open extension point is needed.
//
// All randomness comes from the single seeded rng threaded through
// `render_ensemble`, so a fixed seed reproduces a byte-identical score.
// The Score is the only artifact crossing into the MIDI/audio boundary.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::intent::{HarmonicColor, MusicIntent};

/// One concrete note. Times are in seconds from the start of the piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI pitch (semitones, 0-127).
    pub pitch: u8,
    /// MIDI velocity (0-127).
    pub velocity: u8,
    pub start: f64,
    pub end: f64,
}

/// One voice's output: an instrument assignment plus its note list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceTrack {
    pub name: &'static str,
    /// General MIDI program number.
    pub program: u8,
    /// Percussion tracks map to the MIDI drum channel.
    pub is_drum: bool,
    pub notes: Vec<Note>,
}

impl VoiceTrack {
    fn new(name: &'static str, program: u8, is_drum: bool) -> Self {
        VoiceTrack {
            name,
            program,
            is_drum,
            notes: Vec::new(),
        }
    }
}

/// The complete multi-voice score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub tempo_bpm: u32,
    pub tracks: Vec<VoiceTrack>,
}

impl Score {
    pub fn total_notes(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }
}

/// One instrument voice's note-generation rules.
pub trait VoiceRenderer {
    fn render(&self, intent: &MusicIntent, rng: &mut StdRng) -> VoiceTrack;
}

/// Seconds per curve sample.
fn sample_dt(intent: &MusicIntent) -> f64 {
    intent.duration_seconds as f64 / intent.intensity_curve.len().max(1) as f64
}

/// Scale a [0, 1] control value into a MIDI velocity.
fn midi_velocity(base: f64, span: f64, control: f64) -> u8 {
    (base + span * control).clamp(0.0, 127.0) as u8
}

/// Kick-drum pulse: active above an intensity floor, with hit probability
/// equal to the intensity itself — louder moments are denser.
pub struct Percussion;

impl VoiceRenderer for Percussion {
    fn render(&self, intent: &MusicIntent, rng: &mut StdRng) -> VoiceTrack {
        let mut track = VoiceTrack::new("Percussion", 0, true);
        let dt = sample_dt(intent);

        for (i, &intensity) in intent.intensity_curve.iter().enumerate() {
            if intensity < 0.4 {
                continue;
            }
            if rng.random::<f64>() < intensity {
                let start = i as f64 * dt;
                track.notes.push(Note {
                    pitch: 36, // kick
                    velocity: midi_velocity(40.0, 50.0, intensity),
                    start,
                    end: start + dt * 0.5,
                });
            }
        }
        track
    }
}

/// Sustained root pulse every 8 samples, silent under low intensity.
pub struct Bass;

impl VoiceRenderer for Bass {
    fn render(&self, intent: &MusicIntent, rng: &mut StdRng) -> VoiceTrack {
        let _ = rng; // deterministic voice; keeps the seam uniform
        let mut track = VoiceTrack::new("Bass", 32, false);
        let dt = sample_dt(intent);
        let root = 48u8;

        for (i, &intensity) in intent.intensity_curve.iter().enumerate().step_by(8) {
            if intensity < 0.3 {
                continue;
            }
            track.notes.push(Note {
                pitch: root,
                velocity: midi_velocity(30.0, 40.0, intensity),
                start: i as f64 * dt,
                end: (i + 4) as f64 * dt,
            });
        }
        track
    }
}

/// Long pads every 16 samples; a perfect fifth above the root under high
/// tension, root shifted down a third when the harmonic color is dark.
pub struct Strings;

impl VoiceRenderer for Strings {
    fn render(&self, intent: &MusicIntent, rng: &mut StdRng) -> VoiceTrack {
        let _ = rng;
        let mut track = VoiceTrack::new("Strings", 48, false);
        let dt = sample_dt(intent);
        let root = if intent.harmonic_color == HarmonicColor::Dark {
            57u8
        } else {
            60u8
        };

        for i in (0..intent.intensity_curve.len()).step_by(16) {
            let tension = intent.tension_curve[i];
            let pitch = if tension > 0.6 { root + 7 } else { root };
            track.notes.push(Note {
                pitch,
                velocity: midi_velocity(30.0, 50.0, intent.intensity_curve[i]),
                start: i as f64 * dt,
                end: (i + 16) as f64 * dt,
            });
        }
        track
    }
}

/// Melodic layer: at every sample, emit with probability equal to the
/// density curve, choosing from a fixed consonant offset palette.
pub struct Piano;

/// Diminished-seventh-flavored offsets above the root.
const PIANO_OFFSETS: [u8; 4] = [0, 3, 7, 10];

impl VoiceRenderer for Piano {
    fn render(&self, intent: &MusicIntent, rng: &mut StdRng) -> VoiceTrack {
        let mut track = VoiceTrack::new("Piano", 0, false);
        let dt = sample_dt(intent);
        let root = 60u8;

        for i in 0..intent.density_curve.len() {
            if rng.random::<f64>() > intent.density_curve[i] {
                continue;
            }
            let offset = PIANO_OFFSETS[rng.random_range(0..PIANO_OFFSETS.len())];
            let start = i as f64 * dt;
            track.notes.push(Note {
                pitch: root + offset,
                velocity: midi_velocity(50.0, 40.0, intent.intensity_curve[i]),
                start,
                end: start + dt,
            });
        }
        track
    }
}

/// Render all four voices from one intent, drawing every random decision
/// from the single injected rng.
pub fn render_ensemble(intent: &MusicIntent, rng: &mut StdRng) -> Score {
    let renderers: [&dyn VoiceRenderer; 4] = [&Strings, &Bass, &Piano, &Percussion];
    Score {
        tempo_bpm: intent.tempo_base,
        tracks: renderers.iter().map(|r| r.render(intent, rng)).collect(),
    }
}
