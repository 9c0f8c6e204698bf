//! Results store: append-only persistence of completed attempts plus the
//! leaderboard query.
//!
//! Two backends:
//!   - `MemoryResultsStore`: default when no path is configured
//!   - `JsonFileResultsStore`: a JSON array on disk (also the console scoreboard)
//!
//! Rows are never rewritten or deleted; appends from concurrent sessions are
//! serialized inside the store.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::domain::{LeaderboardEntry, ResultRecord};
use crate::error::StoreError;

#[async_trait]
pub trait ResultsStore: Send + Sync {
  async fn append_result(&self, record: &ResultRecord) -> Result<(), StoreError>;
  async fn list_results(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// Score descending, then earliest timestamp, then insertion order.
pub fn top_n(mut entries: Vec<LeaderboardEntry>, n: usize) -> Vec<LeaderboardEntry> {
  entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.timestamp.cmp(&b.timestamp)));
  entries.truncate(n);
  entries
}

#[derive(Default)]
pub struct MemoryResultsStore {
  rows: RwLock<Vec<ResultRecord>>,
}

impl MemoryResultsStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ResultsStore for MemoryResultsStore {
  async fn append_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
    self.rows.write().await.push(record.clone());
    Ok(())
  }

  async fn list_results(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
    Ok(self.rows.read().await.iter().map(LeaderboardEntry::from).collect())
  }
}

pub struct JsonFileResultsStore {
  path: PathBuf,
  // Serializes load-push-write so concurrent appends don't drop rows.
  lock: Mutex<()>,
}

impl JsonFileResultsStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), lock: Mutex::new(()) }
  }

  fn corrupt_path(&self) -> PathBuf {
    self.path.with_extension("json.corrupt")
  }

  /// Missing content loads as an empty list. A corrupt file is moved aside
  /// to `*.json.corrupt` so the next append never overwrites its rows.
  async fn load(&self) -> Result<Vec<ResultRecord>, StoreError> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(s) if s.trim().is_empty() => Ok(Vec::new()),
      Ok(s) => match serde_json::from_str::<Vec<ResultRecord>>(&s) {
        Ok(rows) => Ok(rows),
        Err(e) => {
          let aside = self.corrupt_path();
          tokio::fs::rename(&self.path, &aside).await?;
          warn!(target: "leaderboard", path = %self.path.display(), moved_to = %aside.display(), error = %e, "Corrupt results file moved aside; starting empty");
          Ok(Vec::new())
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(e.into()),
    }
  }
}

#[async_trait]
impl ResultsStore for JsonFileResultsStore {
  #[instrument(level = "debug", skip(self, record), fields(path = %self.path.display(), score = record.score))]
  async fn append_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
    let _guard = self.lock.lock().await;
    let mut rows = self.load().await?;
    rows.push(record.clone());
    let body = serde_json::to_string_pretty(&rows)?;
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(dir).await?;
    }
    // Write to a sibling then rename, so readers never see half a file.
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    info!(target: "leaderboard", rows = rows.len(), "Result appended");
    Ok(())
  }

  async fn list_results(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
    let _guard = self.lock.lock().await;
    Ok(self.load().await?.iter().map(LeaderboardEntry::from).collect())
  }
}
