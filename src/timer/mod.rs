//! Timer core module
//!
//! This module holds the countdown value type, the session kind tag,
//! and the mutable countdown state wrapped by [`TimerCoordinator`].

pub mod coordinator;
pub mod manager;
pub mod store;

pub use coordinator::{RunState, TimerCoordinator};
pub use manager::TimersManager;
pub use store::{JsonTimerStore, TimerRecord, TimerStore};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::subject::SubjectId;

/// Unique identifier for a timer
pub type TimerId = Uuid;

/// Maximum representable hours component
pub const MAX_HOURS: u8 = 99;

/// Error raised when a duration is constructed from negative components
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid duration: negative components not allowed (h={hours}, m={minutes}, s={seconds})")]
pub struct InvalidDuration {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// An immutable hours/minutes/seconds duration
///
/// Always holds a normalized value: seconds and minutes in `0..=59`,
/// hours in `0..=99`. Overflowing inputs carry into the next larger
/// unit at construction; values past `99:59:59` saturate to the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeValue {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl TimeValue {
    /// The all-zero duration
    pub const ZERO: TimeValue = TimeValue {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Normalize raw components into a TimeValue
    ///
    /// Negative components are rejected. Overflowing seconds carry into
    /// minutes and overflowing minutes into hours; if the carried hours
    /// exceed 99 the value saturates to `99:59:59`.
    pub fn normalize(hours: i64, minutes: i64, seconds: i64) -> Result<Self, InvalidDuration> {
        if hours < 0 || minutes < 0 || seconds < 0 {
            return Err(InvalidDuration {
                hours,
                minutes,
                seconds,
            });
        }
        Ok(Self::carry(hours, minutes, seconds))
    }

    /// Build a TimeValue from trusted (non-negative) components
    ///
    /// Same carry-and-saturate rules as [`TimeValue::normalize`], used
    /// when restoring persisted records where negatives cannot occur.
    pub fn from_parts(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self::carry(hours as i64, minutes as i64, seconds as i64)
    }

    fn carry(mut hours: i64, mut minutes: i64, mut seconds: i64) -> Self {
        minutes += seconds / 60;
        seconds %= 60;
        hours += minutes / 60;
        minutes %= 60;

        if hours > MAX_HOURS as i64 {
            return Self {
                hours: MAX_HOURS,
                minutes: 59,
                seconds: 59,
            };
        }

        Self {
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
        }
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    /// Total duration in seconds
    pub fn total_seconds(&self) -> u64 {
        self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64
    }

    /// Check if the value is all-zero
    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Convert to a std Duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.total_seconds())
    }

    /// The value one second earlier, borrowing from larger units
    ///
    /// Exact inverse of the construction carry. Saturates at zero: the
    /// zero value decrements to itself.
    pub fn decremented(&self) -> Self {
        if self.is_zero() {
            return *self;
        }

        let mut next = *self;
        if next.seconds > 0 {
            next.seconds -= 1;
        } else {
            next.seconds = 59;
            if next.minutes > 0 {
                next.minutes -= 1;
            } else {
                next.minutes = 59;
                if next.hours > 0 {
                    next.hours -= 1;
                }
            }
        }
        next
    }
}

/// Kind of session a timer represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerKind {
    /// Free-standing countdown, not linked to any subject
    #[default]
    #[serde(rename = "FREE_SESSION")]
    FreeSession,
    /// Countdown linked to a tracked subject for time-spent accounting
    #[serde(rename = "STUDY_SESSION")]
    StudySession,
}

impl TimerKind {
    /// Get the human-readable label for this kind (presentation only)
    pub fn label(&self) -> &str {
        match self {
            TimerKind::FreeSession => "🆓 Free session",
            TimerKind::StudySession => "📖 Study session",
        }
    }
}

/// Live countdown state of one timer
///
/// Tracks the current value against the initial baseline it was
/// configured with. Mutated in place by [`Countdown::decrement`] and
/// restored by [`Countdown::reset`].
#[derive(Debug, Clone)]
pub struct Countdown {
    current: TimeValue,
    initial: TimeValue,
    kind: TimerKind,
    linked_subject: Option<SubjectId>,
}

impl Countdown {
    /// Create a countdown at its initial value
    pub fn new(initial: TimeValue, kind: TimerKind, linked_subject: Option<SubjectId>) -> Self {
        Self {
            current: initial,
            initial,
            kind,
            linked_subject,
        }
    }

    /// Restore a countdown mid-flight (current may differ from initial)
    pub fn restore(
        current: TimeValue,
        initial: TimeValue,
        kind: TimerKind,
        linked_subject: Option<SubjectId>,
    ) -> Self {
        Self {
            current,
            initial,
            kind,
            linked_subject,
        }
    }

    pub fn current(&self) -> TimeValue {
        self.current
    }

    pub fn initial(&self) -> TimeValue {
        self.initial
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn linked_subject(&self) -> Option<SubjectId> {
        self.linked_subject
    }

    /// Advance the countdown by one second
    ///
    /// No-op once the current value has reached zero.
    pub fn decrement(&mut self) {
        self.current = self.current.decremented();
    }

    /// Restore the current value to the initial baseline
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Check if the countdown has reached zero
    pub fn is_finished(&self) -> bool {
        self.current.is_zero()
    }

    /// Check if the countdown still sits at its initial value
    pub fn is_at_initial(&self) -> bool {
        self.current == self.initial
    }

    /// Remaining time in total seconds
    pub fn remaining_seconds(&self) -> u64 {
        self.current.total_seconds()
    }

    /// The duration this countdown was configured for
    pub fn initial_duration(&self) -> Duration {
        self.initial.as_duration()
    }
}
