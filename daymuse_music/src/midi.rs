// MIDI output from scores.
//
// Converts a Score into a Standard MIDI File (SMF) for playback and for the
// external soundfont renderer. Each voice maps to a separate MIDI track;
// note times in seconds map to ticks through the score's base tempo.
//
// Uses the `midly` crate. Output is SMF Format 1 (multi-track).

use crate::ensemble::Score;
use midly::{
    Format, Header, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// The General MIDI percussion channel.
const DRUM_CHANNEL: u8 = 9;

/// Convert a Score to MIDI and write it to a file.
pub fn write_midi(score: &Score, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let smf = score_to_smf(score);
    let mut buf = Vec::new();
    smf.write(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn seconds_to_ticks(seconds: f64, tempo_bpm: u32) -> u32 {
    (seconds * tempo_bpm as f64 / 60.0 * TICKS_PER_QUARTER as f64).round() as u32
}

/// Convert a Score to an in-memory SMF.
fn score_to_smf(score: &Score) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track. Floor at 4 BPM so the microsecond value fits
    // the 24-bit tempo field.
    let tempo_bpm = score.tempo_bpm.max(4);
    let mut tempo_track: Track<'static> = Vec::new();
    let tempo_microseconds = 60_000_000 / tempo_bpm;
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
    });
    smf.tracks.push(tempo_track);

    // One track per voice; percussion lands on the GM drum channel.
    let mut next_melodic_channel = 0u8;
    for voice in &score.tracks {
        let channel = if voice.is_drum {
            DRUM_CHANNEL
        } else {
            let c = if next_melodic_channel == DRUM_CHANNEL {
                next_melodic_channel + 1
            } else {
                next_melodic_channel
            };
            next_melodic_channel = c + 1;
            c
        };
        let channel = u4::new(channel);

        let mut track: Track<'static> = Vec::new();
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::TrackName(voice.name.as_bytes())),
        });
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(voice.program),
                },
            },
        });

        // Flatten notes to absolute-tick on/off events, offs first at equal
        // ticks so re-attacked pitches do not cancel themselves.
        let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(voice.notes.len() * 2);
        for note in &voice.notes {
            let on = seconds_to_ticks(note.start, tempo_bpm);
            let mut off = seconds_to_ticks(note.end, tempo_bpm);
            if off <= on {
                off = on + 1; // end > start must survive tick rounding
            }
            events.push((on, true, note.pitch, note.velocity));
            events.push((off, false, note.pitch, 0));
        }
        events.sort_by_key(|&(tick, is_on, pitch, _)| (tick, is_on, pitch));

        let mut last_event_tick = 0u32;
        for (tick, is_on, pitch, velocity) in events {
            let delta = tick - last_event_tick;
            last_event_tick = tick;
            let message = if is_on {
                MidiMessage::NoteOn {
                    key: u7::new(pitch),
                    vel: u7::new(velocity),
                }
            } else {
                MidiMessage::NoteOff {
                    key: u7::new(pitch),
                    vel: u7::new(0),
                }
            };
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: TrackEventKind::Midi { channel, message },
            });
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(midly::MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    smf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{Note, VoiceTrack};

    fn one_voice_score(notes: Vec<Note>) -> Score {
        Score {
            tempo_bpm: 60,
            tracks: vec![VoiceTrack {
                name: "Piano",
                program: 0,
                is_drum: false,
                notes,
            }],
        }
    }

    #[test]
    fn smf_has_tempo_track_plus_one_per_voice() {
        let score = one_voice_score(vec![Note {
            pitch: 60,
            velocity: 80,
            start: 0.0,
            end: 0.5,
        }]);
        let smf = score_to_smf(&score);
        assert_eq!(smf.tracks.len(), 2);
    }

    #[test]
    fn seconds_map_to_ticks_through_tempo() {
        // At 60 BPM one second is one quarter note.
        assert_eq!(seconds_to_ticks(1.0, 60), 480);
        // At 120 BPM one second is two quarter notes.
        assert_eq!(seconds_to_ticks(1.0, 120), 960);
    }

    #[test]
    fn every_note_on_has_a_matching_off() {
        let score = one_voice_score(vec![
            Note {
                pitch: 60,
                velocity: 80,
                start: 0.0,
                end: 1.0,
            },
            Note {
                pitch: 64,
                velocity: 70,
                start: 0.5,
                end: 1.5,
            },
        ]);
        let smf = score_to_smf(&score);
        let mut ons = 0;
        let mut offs = 0;
        for event in &smf.tracks[1] {
            if let TrackEventKind::Midi { message, .. } = &event.kind {
                match message {
                    MidiMessage::NoteOn { .. } => ons += 1,
                    MidiMessage::NoteOff { .. } => offs += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(ons, 2);
        assert_eq!(offs, 2);
    }

    #[test]
    fn zero_length_note_still_gets_a_positive_tick_span() {
        let score = one_voice_score(vec![Note {
            pitch: 60,
            velocity: 80,
            start: 0.0,
            end: 0.0001,
        }]);
        let smf = score_to_smf(&score);
        // on at tick 0, off forced to tick 1
        let deltas: Vec<u32> = smf.tracks[1]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. } => {
                        Some(e.delta.as_int())
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec![0, 1]);
    }

    #[test]
    fn drum_voice_lands_on_channel_nine() {
        let score = Score {
            tempo_bpm: 90,
            tracks: vec![VoiceTrack {
                name: "Percussion",
                program: 0,
                is_drum: true,
                notes: vec![Note {
                    pitch: 36,
                    velocity: 90,
                    start: 0.0,
                    end: 0.25,
                }],
            }],
        };
        let smf = score_to_smf(&score);
        for event in &smf.tracks[1] {
            if let TrackEventKind::Midi { channel, .. } = event.kind {
                assert_eq!(channel.as_int(), 9);
            }
        }
    }
}
