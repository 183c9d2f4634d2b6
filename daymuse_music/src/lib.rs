// Daymuse music generator.
//
// Expands a day's semantic features (from `daymuse_semantics`) into
// time-varying musical control curves and then into concrete multi-voice
// note sequences, written out as MIDI for the external soundfont renderer.
//
// Architecture:
// - intent.rs: MusicIntent — intensity/tension/density curves plus global
//   tempo, harmonic color and motion profile; a pure mapping from features
// - ensemble.rs: the four-voice generator (percussion, bass, strings,
//   piano) behind one VoiceRenderer trait; Note/Score types
// - solo.rs: richer standalone solo-piano generator with a motif engine
//   (walk, inversion, stretching, regeneration) and left-hand harmony
// - midi.rs: Score to Standard MIDI File via `midly`
// - pipeline.rs: the daily run — load continuity from the store, extract
//   features, persist today's state, compose
//
// Generation is deterministic given a seed: one injected rng drives every
// random decision, supporting reproducible output.

pub mod ensemble;
pub mod intent;
pub mod midi;
pub mod pipeline;
pub mod solo;
