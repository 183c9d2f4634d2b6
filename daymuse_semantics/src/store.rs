// Daily persistence for cross-day continuity.
//
// Three independent namespaces under one root directory, each keyed by ISO
// calendar date: embeddings (JSON vector), velocity (plain-text float),
// emotion (JSON triple). Every save also refreshes a `latest` alias; when
// the alias is missing, `load_latest` falls back to yesterday's dated file.
//
// All writes go through a temp-file + rename so a crashed run never leaves
// a half-written record behind. The pipeline receives this store as an
// explicit dependency and never touches the filesystem elsewhere.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::embedding::Embedding;
use crate::emotion::EmotionState;

/// Default rolling-history window in days.
pub const DEFAULT_HISTORY_DAYS: usize = 14;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("store record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("velocity record is not a valid float: {0}")]
    BadVelocity(#[from] std::num::ParseFloatError),
}

/// Filesystem-backed store for per-day records.
#[derive(Debug, Clone)]
pub struct DailyStore {
    root: PathBuf,
}

impl DailyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DailyStore { root: root.into() }
    }

    fn namespace(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn day_path(&self, namespace: &str, day: NaiveDate, ext: &str) -> PathBuf {
        self.namespace(namespace).join(format!("{day}.{ext}"))
    }

    fn latest_path(&self, namespace: &str, ext: &str) -> PathBuf {
        self.namespace(namespace).join(format!("latest.{ext}"))
    }

    /// Write a record for `day` and refresh the `latest` alias.
    fn write_record(
        &self,
        namespace: &str,
        day: NaiveDate,
        ext: &str,
        contents: &[u8],
    ) -> Result<(), StoreError> {
        fs::create_dir_all(self.namespace(namespace))?;
        write_atomic(&self.day_path(namespace, day, ext), contents)?;
        write_atomic(&self.latest_path(namespace, ext), contents)?;
        debug!(namespace, %day, "saved daily record");
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read `latest`, falling back to yesterday's dated file.
    fn read_latest(
        &self,
        namespace: &str,
        ext: &str,
        today: NaiveDate,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(bytes) = self.read_record(&self.latest_path(namespace, ext))? {
            return Ok(Some(bytes));
        }
        let yesterday = today - Days::new(1);
        self.read_record(&self.day_path(namespace, yesterday, ext))
    }

    // --- Embeddings ---

    pub fn save_embedding(&self, day: NaiveDate, daily: &Embedding) -> Result<(), StoreError> {
        self.write_record("embeddings", day, "json", &serde_json::to_vec(daily)?)
    }

    pub fn load_embedding(&self, day: NaiveDate) -> Result<Option<Embedding>, StoreError> {
        self.read_record(&self.day_path("embeddings", day, "json"))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn load_latest_embedding(
        &self,
        today: NaiveDate,
    ) -> Result<Option<Embedding>, StoreError> {
        self.read_latest("embeddings", "json", today)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }

    /// Rebuild the rolling history: daily embeddings for the `n` days before
    /// `today`, most recent first. Missing days are skipped, not interpolated.
    pub fn load_last_n_days(
        &self,
        today: NaiveDate,
        n: usize,
    ) -> Result<Vec<Embedding>, StoreError> {
        let mut history = Vec::new();
        for delta in 1..=n as u64 {
            let day = today - Days::new(delta);
            if let Some(embedding) = self.load_embedding(day)? {
                history.push(embedding);
            }
        }
        Ok(history)
    }

    // --- Velocity ---

    pub fn save_velocity(&self, day: NaiveDate, velocity: f64) -> Result<(), StoreError> {
        self.write_record("velocity", day, "txt", format!("{velocity:.6}").as_bytes())
    }

    pub fn load_velocity(&self, day: NaiveDate) -> Result<Option<f64>, StoreError> {
        self.read_record(&self.day_path("velocity", day, "txt"))?
            .map(parse_velocity)
            .transpose()
    }

    pub fn load_latest_velocity(&self, today: NaiveDate) -> Result<Option<f64>, StoreError> {
        self.read_latest("velocity", "txt", today)?
            .map(parse_velocity)
            .transpose()
    }

    // --- Emotion ---

    pub fn save_emotion(&self, day: NaiveDate, emotion: &EmotionState) -> Result<(), StoreError> {
        self.write_record("emotion", day, "json", &serde_json::to_vec_pretty(emotion)?)
    }

    pub fn load_emotion(&self, day: NaiveDate) -> Result<Option<EmotionState>, StoreError> {
        self.read_record(&self.day_path("emotion", day, "json"))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }

    pub fn load_latest_emotion(
        &self,
        today: NaiveDate,
    ) -> Result<Option<EmotionState>, StoreError> {
        self.read_latest("emotion", "json", today)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }
}

fn parse_velocity(bytes: Vec<u8>) -> Result<f64, StoreError> {
    Ok(String::from_utf8_lossy(&bytes).trim().parse::<f64>()?)
}

/// Write via a sibling temp file and rename, so readers and the `latest`
/// alias never observe a partial record.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
