//! Subject (study course) module
//!
//! Subjects accumulate time spent across completed study sessions and
//! track progress toward a target study time.

pub mod store;

pub use store::{JsonSubjectStore, SharedSubjectStore, SubjectStore};

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a subject
pub type SubjectId = Uuid;

/// Progress status of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubjectStatus {
    #[default]
    #[serde(rename = "NOT_STARTED")]
    NotStarted,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl SubjectStatus {
    /// Get the display name for this status
    pub fn display_name(&self) -> &str {
        match self {
            SubjectStatus::NotStarted => "Not started",
            SubjectStatus::InProgress => "In progress",
            SubjectStatus::Completed => "Completed",
        }
    }
}

/// A tracked study course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique identifier
    pub id: SubjectId,
    /// Display name
    pub name: String,
    /// Target cumulative study time
    #[serde(with = "duration_secs")]
    pub target_time: Duration,
    /// Time already spent studying
    #[serde(with = "duration_secs")]
    pub time_spent: Duration,
    /// Duration pre-filled when creating a timer for this subject
    #[serde(with = "duration_secs")]
    pub default_timer_duration: Duration,
    /// Progress status, derived from time spent vs. target
    #[serde(default)]
    pub status: SubjectStatus,
    /// When the subject was last credited with a study session
    #[serde(default)]
    pub last_study_date: Option<DateTime<Utc>>,
}

impl Subject {
    /// Create a new subject with the given target study time
    pub fn new(name: String, target_time: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            target_time,
            time_spent: Duration::ZERO,
            default_timer_duration: Duration::from_secs(25 * 60),
            status: SubjectStatus::NotStarted,
            last_study_date: None,
        }
    }

    /// Create a new subject with a specific default timer duration
    pub fn with_default_timer(name: String, target_time: Duration, default_timer: Duration) -> Self {
        let mut subject = Self::new(name, target_time);
        subject.default_timer_duration = default_timer;
        subject
    }

    /// Credit the subject with a completed study session
    ///
    /// Accumulates the duration, stamps the last-study date, and promotes
    /// the status once the target is reached.
    pub fn add_time_spent(&mut self, duration: Duration) {
        self.time_spent += duration;
        self.last_study_date = Some(Utc::now());
        self.update_status();
    }

    fn update_status(&mut self) {
        if !self.target_time.is_zero() && self.time_spent >= self.target_time {
            self.status = SubjectStatus::Completed;
        } else if !self.time_spent.is_zero() {
            self.status = SubjectStatus::InProgress;
        }
    }

    /// Check if the subject has reached its target time
    pub fn is_completed(&self) -> bool {
        self.status == SubjectStatus::Completed
    }

    /// Time still needed to reach the target
    pub fn remaining_time(&self) -> Duration {
        self.target_time.saturating_sub(self.time_spent)
    }

    /// Progress toward the target as a percentage, capped at 100
    pub fn progress_percentage(&self) -> f64 {
        if self.target_time.is_zero() {
            return 0.0;
        }
        let progress = self.time_spent.as_secs_f64() / self.target_time.as_secs_f64() * 100.0;
        progress.min(100.0)
    }

    /// Format the progress percentage as a display string
    pub fn format_progress(&self) -> String {
        format!("{:.0}%", self.progress_percentage())
    }

    /// Format a duration as `XhMM` for subject summaries
    pub fn format_time_spent(&self) -> String {
        format_hours_minutes(self.time_spent)
    }

    /// Format the target time as `XhMM`
    pub fn format_target_time(&self) -> String {
        format_hours_minutes(self.target_time)
    }
}

/// Format a duration as `XhMM` (e.g. `2h05`)
fn format_hours_minutes(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    format!("{}h{:02}", hours, minutes)
}

/// Custom serde module for Duration (stored as seconds)
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
