//! Results waiting to be saved, with JSON persistence and reconciliation.
//!
//! A result whose save failed is queued here instead of being discarded.
//! The queue survives restarts as a JSON file and is drained by
//! [`PendingQueue::sync`].

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ExamResult;
use crate::traits::ResultStore;

/// File name of the queue inside the data directory.
pub const QUEUE_FILE: &str = "pending-results.json";

/// A result that has not reached the store yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub local_id: Uuid,
    pub result: ExamResult,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Ordered queue of unsynced results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingQueue {
    #[serde(default)]
    entries: Vec<PendingEntry>,
}

/// A queued result the store has accepted.
#[derive(Debug, Clone)]
pub struct SyncedEntry {
    pub local_id: Uuid,
    /// The result as it was queued.
    pub local: ExamResult,
    /// The result as the store returned it.
    pub saved: ExamResult,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub synced: Vec<SyncedEntry>,
    /// Entries still queued.
    pub remaining: usize,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result and return its local id.
    pub fn push(&mut self, result: ExamResult, error: Option<String>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.entries.push(PendingEntry {
            local_id,
            result,
            queued_at: Utc::now(),
            attempts: 1,
            last_error: error,
        });
        local_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    /// Push every queued result to the store, oldest first.
    ///
    /// Accepted entries leave the queue. A connectivity failure stops the
    /// pass early since the rest would fail the same way; a rejection only
    /// skips that entry.
    pub async fn sync(&mut self, store: &dyn ResultStore) -> SyncReport {
        let mut report = SyncReport::default();
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut entries = std::mem::take(&mut self.entries).into_iter();

        for mut entry in entries.by_ref() {
            match store.save_result(&entry.result).await {
                Ok(saved) => {
                    tracing::info!(local_id = %entry.local_id, "synced pending result");
                    report.synced.push(SyncedEntry {
                        local_id: entry.local_id,
                        local: entry.result,
                        saved,
                    });
                }
                Err(e) => {
                    tracing::warn!(local_id = %entry.local_id, "pending result not synced: {e}");
                    entry.attempts += 1;
                    entry.last_error = Some(e.to_string());
                    kept.push(entry);
                    if e.is_connectivity() {
                        break;
                    }
                }
            }
        }

        kept.extend(entries);
        self.entries = kept;
        report.remaining = self.entries.len();
        report
    }

    /// Load a queue from a JSON file. A missing file is an empty queue.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pending queue from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse pending queue JSON")
    }

    /// Save the queue as JSON, creating parent directories as needed.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize pending queue")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write pending queue to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, ExamType, Section, StudentRef};

    fn result(score: u8) -> ExamResult {
        ExamResult {
            id: None,
            student: StudentRef {
                id: "s9".into(),
                name: "Tolu".into(),
            },
            classification: Classification::new(Section::College, 9, "Yoruba", ExamType::Exam),
            score,
            correct: 1,
            total: 2,
            details: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let queue = PendingQueue::load_json(&dir.path().join(QUEUE_FILE)).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(QUEUE_FILE);

        let mut queue = PendingQueue::new();
        let id = queue.push(result(50), Some("store unreachable".into()));
        queue.push(result(70), None);
        queue.save_json(&path).unwrap();

        let loaded = PendingQueue::load_json(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries()[0].local_id, id);
        assert_eq!(loaded.entries()[0].result.score, 50);
        assert_eq!(
            loaded.entries()[0].last_error.as_deref(),
            Some("store unreachable")
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(QUEUE_FILE);
        std::fs::write(&path, "not json").unwrap();
        assert!(PendingQueue::load_json(&path).is_err());
    }
}
