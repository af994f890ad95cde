//! Append-only journal of committed ledger changes.
//!
//! Events are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access. The ledger remains the source of
//! truth; the journal is an audit trail.

use crate::{Resource, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A committed change to one account
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub user_id: String,
    pub kind: EventKind,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    AccountOpened {
        starting_gold: u64,
    },
    Mined {
        resource: Resource,
        amount: u64,
        new_total: u64,
    },
    DailyClaimed {
        resource: Resource,
        amount: u64,
        new_total: u64,
    },
}

impl LedgerEvent {
    pub fn new(user_id: &str, at: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            at,
            user_id: user_id.to_string(),
            kind,
        }
    }
}

/// Event sink trait for recording ledger events
pub trait EventSink: Send + Sync {
    fn append(&self, event: &LedgerEvent) -> Result<()>;
}

/// JSONL-based event sink with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EventSink for JsonlJournal {
    fn append(&self, event: &LedgerEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per line so a reader never sees half an event
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let written = (&file).write_all(line.as_bytes());

        file.unlock()?;
        written?;

        tracing::debug!("Journaled event {} for user {}", event.id, event.user_id);
        Ok(())
    }
}

/// Read all events from a journal file
pub fn read_events(path: &Path) -> Result<Vec<LedgerEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LedgerEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse journal event at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} events from journal", events.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mined(total: u64) -> LedgerEvent {
        LedgerEvent::new(
            "42",
            Utc::now(),
            EventKind::Mined {
                resource: Resource::Wood,
                amount: 10,
                new_total: total,
            },
        )
    }

    #[test]
    fn test_append_and_read_single_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal.jsonl");

        let event = mined(10);
        let journal = JsonlJournal::new(&path);
        journal.append(&event).unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events, vec![event]);
    }

    #[test]
    fn test_append_multiple_events_in_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/journal.jsonl");

        let journal = JsonlJournal::new(&path);
        for i in 1..=5 {
            journal.append(&mined(i * 10)).unwrap();
        }

        let totals: Vec<u64> = read_events(&path)
            .unwrap()
            .into_iter()
            .map(|e| match e.kind {
                EventKind::Mined { new_total, .. } => new_total,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(totals, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal.jsonl");

        let journal = JsonlJournal::new(&path);
        journal.append(&mined(10)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ not an event").unwrap();
        journal.append(&mined(20)).unwrap();

        assert_eq!(read_events(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = LedgerEvent::new("7", Utc::now(), EventKind::AccountOpened { starting_gold: 100 });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"]["type"], "account_opened");
        assert_eq!(value["kind"]["starting_gold"], 100);
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let events = read_events(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(events.is_empty());
    }
}
