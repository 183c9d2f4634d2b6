// Daymuse semantic-temporal feature engine.
//
// Turns a day's batch of article embeddings, plus rolling per-day history,
// into a small set of interpretable semantic and emotional features that the
// music crate expands into a score. The embedding model itself is an external
// collaborator: everything here operates on plain fixed-length vectors.
//
// Architecture:
// - embedding.rs: vector math (cosine similarity/distance), batch validation,
//   daily aggregation (weighted mean)
// - cluster.rs: seeded k-means topic clustering + cluster-size statistics
// - features.rs: the feature extractor (shift, novelty, entropy, dispersion,
//   velocity, acceleration) and the narrative phase classifier
// - emotion.rs: raw emotion estimation + day-over-day exponential smoothing
// - store.rs: filesystem-backed daily persistence (embeddings, velocity,
//   emotion), keyed by calendar date with a "latest" alias
// - error.rs: the crate's error taxonomy
//
// Every computation that depends on optional history (rolling mean,
// yesterday's embedding/velocity/emotion) has an explicit zero/identity
// fallback: a cold start must produce a valid, if neutral, result.

pub mod cluster;
pub mod embedding;
pub mod emotion;
pub mod error;
pub mod features;
pub mod store;

pub use embedding::Embedding;
pub use emotion::EmotionState;
pub use error::SemanticsError;
pub use features::{NarrativePhase, SemanticFeatures};
pub use store::DailyStore;
