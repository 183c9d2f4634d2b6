// Daily pipeline: embeddings in, persisted state updated, score out.
//
// `run_pipeline` is the pure chain (aggregate -> features -> intent) used by
// tests and callers that manage their own state. `run_day` wraps it with the
// daily store: it loads the rolling history and yesterday's continuity
// values, persists today's embedding/velocity/emotion, and renders the
// ensemble score. The store is the only stateful collaborator and is passed
// in explicitly.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::info;

use daymuse_semantics::embedding::aggregate;
use daymuse_semantics::features::{DEFAULT_NUM_CLUSTERS, extract_features};
use daymuse_semantics::store::{DEFAULT_HISTORY_DAYS, StoreError};
use daymuse_semantics::{DailyStore, Embedding, EmotionState, SemanticFeatures, SemanticsError};

use crate::ensemble::{Score, render_ensemble};
use crate::intent::{DEFAULT_DURATION_SECONDS, DEFAULT_RESOLUTION, MusicIntent, build_intent};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Semantics(#[from] SemanticsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tunable knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub num_clusters: usize,
    pub duration_seconds: u32,
    pub resolution: u32,
    pub history_days: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            num_clusters: DEFAULT_NUM_CLUSTERS,
            duration_seconds: DEFAULT_DURATION_SECONDS,
            resolution: DEFAULT_RESOLUTION,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

/// Everything one day's run produces.
#[derive(Debug, Clone)]
pub struct DayOutput {
    pub features: SemanticFeatures,
    pub intent: MusicIntent,
    pub daily_embedding: Embedding,
    pub score: Score,
}

/// The pure semantics-to-intent chain, with all history passed in.
pub fn run_pipeline(
    batch: &[Embedding],
    history: &[Embedding],
    yesterday_embedding: Option<&Embedding>,
    yesterday_velocity: Option<f64>,
    yesterday_emotion: Option<&EmotionState>,
    config: &PipelineConfig,
) -> Result<(SemanticFeatures, MusicIntent, Embedding), SemanticsError> {
    let daily = aggregate(batch, None)?;
    let features = extract_features(
        batch,
        &daily,
        history,
        yesterday_embedding,
        yesterday_velocity,
        yesterday_emotion,
        config.num_clusters,
    )?;
    let intent = build_intent(&features, config.duration_seconds, config.resolution);
    Ok((features, intent, daily))
}

/// Run one full day against the store: load continuity, compute, persist,
/// compose. The rng drives every random decision in the generated score.
pub fn run_day(
    store: &DailyStore,
    day: NaiveDate,
    batch: &[Embedding],
    config: &PipelineConfig,
    rng: &mut StdRng,
) -> Result<DayOutput, PipelineError> {
    let history = store.load_last_n_days(day, config.history_days)?;
    let yesterday_embedding = store.load_latest_embedding(day)?;
    let yesterday_velocity = store.load_latest_velocity(day)?;
    let yesterday_emotion = store.load_latest_emotion(day)?;
    info!(
        %day,
        articles = batch.len(),
        history_len = history.len(),
        cold_start = yesterday_embedding.is_none(),
        "running daily pipeline"
    );

    let (features, intent, daily_embedding) = run_pipeline(
        batch,
        &history,
        yesterday_embedding.as_ref(),
        yesterday_velocity,
        yesterday_emotion.as_ref(),
        config,
    )?;

    store.save_embedding(day, &daily_embedding)?;
    store.save_velocity(day, features.semantic_velocity)?;
    store.save_emotion(day, &features.emotion)?;

    let score = render_ensemble(&intent, rng);
    info!(
        phase = features.narrative_phase.as_str(),
        tempo = intent.tempo_base,
        notes = score.total_notes(),
        "composed ensemble score"
    );

    Ok(DayOutput {
        features,
        intent,
        daily_embedding,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn batch(seed: u64) -> Vec<Embedding> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..6)
            .map(|_| (0..24).map(|_| rng.random_range(-1.0f32..1.0)).collect())
            .collect()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn cold_start_day_composes_with_neutral_motion() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyStore::new(dir.path());
        let config = PipelineConfig {
            duration_seconds: 10,
            ..PipelineConfig::default()
        };
        let output = run_day(
            &store,
            day("2025-06-01"),
            &batch(1),
            &config,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

        assert_eq!(output.features.semantic_velocity, 0.0);
        assert_eq!(output.features.semantic_shift, 0.0);
        assert_eq!(output.intent.intensity_curve.len(), 80);
        // Today's state is now persisted for tomorrow.
        assert!(store.load_embedding(day("2025-06-01")).unwrap().is_some());
        assert!(store.load_velocity(day("2025-06-01")).unwrap().is_some());
        assert!(store.load_emotion(day("2025-06-01")).unwrap().is_some());
    }

    #[test]
    fn second_day_picks_up_yesterdays_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyStore::new(dir.path());
        let config = PipelineConfig {
            duration_seconds: 10,
            ..PipelineConfig::default()
        };
        run_day(
            &store,
            day("2025-06-01"),
            &batch(1),
            &config,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
        let second = run_day(
            &store,
            day("2025-06-02"),
            &batch(2),
            &config,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

        // A different batch moves the daily vector, so velocity registers.
        assert!(second.features.semantic_velocity > 0.0);
        // One day of history feeds shift and novelty.
        assert!(second.features.semantic_novelty > 0.0);
    }

    #[test]
    fn same_seed_reproduces_the_same_score() {
        let config = PipelineConfig {
            duration_seconds: 10,
            ..PipelineConfig::default()
        };
        let run = |seed: u64| {
            let dir = tempfile::tempdir().unwrap();
            let store = DailyStore::new(dir.path());
            run_day(
                &store,
                day("2025-06-01"),
                &batch(3),
                &config,
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap()
            .score
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn empty_batch_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = DailyStore::new(dir.path());
        let result = run_day(
            &store,
            day("2025-06-01"),
            &[],
            &PipelineConfig::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Semantics(SemanticsError::EmptyBatch))
        ));
    }
}
