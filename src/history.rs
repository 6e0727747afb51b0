use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use tracing::warn;

use crate::error::HistoryResult;

/// One analysed menu in the run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub label: String,
    pub item_count: usize,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn now(label: impl Into<String>, item_count: usize) -> Self {
        Self {
            label: label.into(),
            item_count,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()>;

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>>;
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        Ok(self.entries.lock().await.clone())
    }
}

/// Append-only history file with one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonLinesHistory {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        // A crash mid-append leaves a torn last line; skip it instead of losing the log.
        let entries = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(path = %self.path.display(), line = idx + 1, error = %err, "skipping unreadable history line");
                    None
                }
            })
            .collect();
        Ok(entries)
    }
}
