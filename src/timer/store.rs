//! Timer persistence
//!
//! Handles saving and loading timer countdown snapshots to/from a flat
//! JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::data_dir;
use crate::subject::SubjectId;

use super::{Countdown, TimeValue, TimerId, TimerKind};

const TIMERS_FILE: &str = "timers.json";

/// Serialized snapshot of one timer's countdown state
///
/// The `init_*` fields are optional for compatibility with records
/// written before the initial baseline was persisted: when any of the
/// three is absent, the initial value falls back to the current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Stable timer identifier
    pub id: TimerId,
    /// Current countdown value
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    /// Initial baseline the timer was configured with
    #[serde(default)]
    pub init_hours: Option<u8>,
    #[serde(default)]
    pub init_minutes: Option<u8>,
    #[serde(default)]
    pub init_seconds: Option<u8>,
    /// Session kind tag
    pub kind: TimerKind,
    /// Linked subject, present only for study sessions
    #[serde(default)]
    pub linked_subject: Option<SubjectId>,
}

impl TimerRecord {
    /// Snapshot a countdown into a persistable record
    pub fn from_countdown(id: TimerId, countdown: &Countdown) -> Self {
        let current = countdown.current();
        let initial = countdown.initial();
        Self {
            id,
            hours: current.hours(),
            minutes: current.minutes(),
            seconds: current.seconds(),
            init_hours: Some(initial.hours()),
            init_minutes: Some(initial.minutes()),
            init_seconds: Some(initial.seconds()),
            kind: countdown.kind(),
            linked_subject: countdown.linked_subject(),
        }
    }

    /// Rebuild the countdown state this record describes
    pub fn into_countdown(self) -> Countdown {
        let current = TimeValue::from_parts(self.hours, self.minutes, self.seconds);

        // Records written before the baseline was persisted carry no
        // init fields; treat the current value as the baseline then.
        let initial = match (self.init_hours, self.init_minutes, self.init_seconds) {
            (Some(h), Some(m), Some(s)) => TimeValue::from_parts(h, m, s),
            _ => current,
        };

        Countdown::restore(current, initial, self.kind, self.linked_subject)
    }
}

/// Persistence contract for timer records
///
/// Implementations are write-through: mutations hit the backing store
/// immediately. Callers treat failures as best-effort.
pub trait TimerStore {
    /// Upsert a record by id
    fn save(&mut self, record: TimerRecord) -> Result<()>;

    /// Get all persisted records
    fn find_all(&self) -> Vec<TimerRecord>;

    /// Look up a record by id
    fn find_by_id(&self, id: TimerId) -> Option<TimerRecord>;

    /// Delete a record by id
    fn delete_by_id(&mut self, id: TimerId) -> Result<()>;
}

/// Flat-JSON timer store
#[derive(Debug)]
pub struct JsonTimerStore {
    timers: Vec<TimerRecord>,
    store_path: PathBuf,
}

impl JsonTimerStore {
    /// Open the store at the default data location
    pub fn open() -> Self {
        Self::open_at(data_dir().join(TIMERS_FILE))
    }

    /// Open the store at a specific path (for testing)
    pub fn open_at(path: PathBuf) -> Self {
        let timers = match Self::load_from(&path) {
            Ok(timers) => timers,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load timers, starting empty"
                );
                Vec::new()
            }
        };
        Self {
            timers,
            store_path: path,
        }
    }

    /// Get the path to the store file
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    fn load_from(path: &Path) -> Result<Vec<TimerRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path).context("Failed to read timers file")?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).context("Failed to parse timers file")
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create directory for timers file")?;
        }

        let content =
            serde_json::to_string_pretty(&self.timers).context("Failed to serialize timers")?;

        std::fs::write(&self.store_path, content).context("Failed to write timers file")?;

        Ok(())
    }
}

impl TimerStore for JsonTimerStore {
    fn save(&mut self, record: TimerRecord) -> Result<()> {
        match self.timers.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record,
            None => self.timers.push(record),
        }
        self.persist()
    }

    fn find_all(&self) -> Vec<TimerRecord> {
        self.timers.clone()
    }

    fn find_by_id(&self, id: TimerId) -> Option<TimerRecord> {
        self.timers.iter().find(|t| t.id == id).cloned()
    }

    fn delete_by_id(&mut self, id: TimerId) -> Result<()> {
        self.timers.retain(|t| t.id != id);
        self.persist()
    }
}
