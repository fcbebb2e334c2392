//! Timer coordinator module
//!
//! The coordinator is the operational state machine around one
//! [`Countdown`]: it owns the running/can-reset flags, fires callbacks
//! on state changes, and credits the linked subject when the countdown
//! completes.

use uuid::Uuid;

use crate::format;
use crate::subject::store::{SharedSubjectStore, SubjectStore};
use crate::subject::SubjectId;

use super::{Countdown, InvalidDuration, TimeValue, TimerId, TimerKind, TimerRecord};

/// Callback slot invoked with the id of the timer that changed
pub type TimerCallback = Box<dyn FnMut(TimerId)>;

/// Derived run state of a coordinator, for display surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not running, countdown untouched since configuration
    Idle,
    /// Tick-active
    Running,
    /// Not running, mid-countdown
    Paused,
    /// Countdown has reached zero
    Finished,
}

impl RunState {
    /// Get the display name for this state
    pub fn display_name(&self) -> &str {
        match self {
            RunState::Idle => "Ready",
            RunState::Running => "Running",
            RunState::Paused => "Paused",
            RunState::Finished => "Finished",
        }
    }
}

/// Run/pause/reset state machine around a single countdown
pub struct TimerCoordinator {
    id: TimerId,
    countdown: Countdown,
    running: bool,
    can_reset: bool,
    subjects: SharedSubjectStore,
    on_state_changed: Option<TimerCallback>,
    on_finished: Option<TimerCallback>,
}

impl TimerCoordinator {
    /// Create a coordinator around a fresh countdown
    pub fn new(
        initial: TimeValue,
        kind: TimerKind,
        linked_subject: Option<SubjectId>,
        subjects: SharedSubjectStore,
    ) -> Self {
        Self::with_countdown(
            Uuid::new_v4(),
            Countdown::new(initial, kind, linked_subject),
            subjects,
        )
    }

    /// Rebuild a coordinator from a persisted record
    ///
    /// Restored timers come back stopped: running and can-reset are
    /// cleared regardless of the state they were persisted in.
    pub fn from_record(record: TimerRecord, subjects: SharedSubjectStore) -> Self {
        let id = record.id;
        Self::with_countdown(id, record.into_countdown(), subjects)
    }

    fn with_countdown(id: TimerId, countdown: Countdown, subjects: SharedSubjectStore) -> Self {
        Self {
            id,
            countdown,
            running: false,
            can_reset: false,
            subjects,
            on_state_changed: None,
            on_finished: None,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn can_reset(&self) -> bool {
        self.can_reset
    }

    pub fn is_finished(&self) -> bool {
        self.countdown.is_finished()
    }

    pub fn kind(&self) -> TimerKind {
        self.countdown.kind()
    }

    pub fn linked_subject(&self) -> Option<SubjectId> {
        self.countdown.linked_subject()
    }

    /// Check if this coordinator is active (running or not yet finished)
    pub fn is_active(&self) -> bool {
        self.running || !self.countdown.is_finished()
    }

    /// Derived run state
    pub fn run_state(&self) -> RunState {
        if self.countdown.is_finished() {
            RunState::Finished
        } else if self.running {
            RunState::Running
        } else if self.can_reset {
            RunState::Paused
        } else {
            RunState::Idle
        }
    }

    /// Compact display of the remaining time
    ///
    /// `HH:MM:SS` while hours remain, `MM:SS` while minutes remain,
    /// bare seconds below one minute.
    pub fn display(&self) -> String {
        format::format_compact(self.countdown.current())
    }

    /// Register the state-changed callback
    pub fn set_on_state_changed(&mut self, callback: TimerCallback) {
        self.on_state_changed = Some(callback);
    }

    /// Register the finished callback
    pub fn set_on_finished(&mut self, callback: TimerCallback) {
        self.on_finished = Some(callback);
    }

    /// Start the countdown
    ///
    /// No-op on a finished or already-running timer.
    pub fn start(&mut self) {
        if self.running || self.countdown.is_finished() {
            return;
        }
        self.running = true;
        self.can_reset = true;
        self.notify_state_changed();
    }

    /// Pause the countdown
    ///
    /// No-op unless running.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.notify_state_changed();
    }

    /// Start if stopped and not finished, pause otherwise
    pub fn toggle(&mut self) {
        if !self.running && !self.countdown.is_finished() {
            self.start();
        } else {
            self.pause();
        }
    }

    /// Stop without touching the countdown value
    ///
    /// Clears both flags; no-op when both are already cleared.
    pub fn stop(&mut self) {
        if !self.running && !self.can_reset {
            return;
        }
        self.running = false;
        self.can_reset = false;
        self.notify_state_changed();
    }

    /// Stop and restore the countdown to its initial value
    pub fn reset(&mut self) {
        let unchanged = !self.running && !self.can_reset && self.countdown.is_at_initial();
        if unchanged {
            return;
        }
        self.running = false;
        self.can_reset = false;
        self.countdown.reset();
        self.notify_state_changed();
    }

    /// Advance the countdown by one second
    ///
    /// Driven by the external 1 Hz scheduler; no-op unless running.
    /// Reaching zero stops the timer, credits the linked subject with
    /// the initially configured duration, and fires the finished
    /// callback exactly once.
    pub fn decrement(&mut self) {
        if !self.running {
            return;
        }

        self.countdown.decrement();
        let finished = self.countdown.is_finished();
        if finished {
            self.running = false;
            self.can_reset = true;
        }

        self.notify_state_changed();

        if finished {
            self.credit_linked_subject();
            self.notify_finished();
        }
    }

    /// Replace the countdown with a new configuration
    ///
    /// The new value becomes the initial baseline; running and
    /// can-reset are cleared.
    pub fn reconfigure(
        &mut self,
        hours: i64,
        minutes: i64,
        seconds: i64,
        kind: TimerKind,
        linked_subject: Option<SubjectId>,
    ) -> Result<(), InvalidDuration> {
        let initial = TimeValue::normalize(hours, minutes, seconds)?;
        self.countdown = Countdown::new(initial, kind, linked_subject);
        self.running = false;
        self.can_reset = false;
        self.notify_state_changed();
        Ok(())
    }

    /// Credit the linked subject with the configured session length
    ///
    /// The credit is the timer's initial duration, not elapsed wall
    /// clock. Persistence is best-effort.
    fn credit_linked_subject(&mut self) {
        let Some(subject_id) = self.countdown.linked_subject() else {
            return;
        };
        let session_duration = self.countdown.initial_duration();

        let mut subjects = self.subjects.borrow_mut();
        match subjects.find_by_id(subject_id) {
            Some(mut subject) => {
                subject.add_time_spent(session_duration);
                tracing::info!(
                    timer_id = %self.id,
                    subject = %subject.name,
                    credited_secs = session_duration.as_secs(),
                    "Study session finished, crediting subject"
                );
                if let Err(e) = subjects.save(subject) {
                    tracing::warn!(
                        timer_id = %self.id,
                        subject_id = %subject_id,
                        error = %e,
                        "Failed to persist subject time credit"
                    );
                }
            }
            None => {
                tracing::warn!(
                    timer_id = %self.id,
                    subject_id = %subject_id,
                    "Finished timer is linked to an unknown subject"
                );
            }
        }
    }

    fn notify_state_changed(&mut self) {
        if let Some(callback) = self.on_state_changed.as_mut() {
            callback(self.id);
        }
    }

    fn notify_finished(&mut self) {
        if let Some(callback) = self.on_finished.as_mut() {
            callback(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{JsonSubjectStore, Subject, SubjectStore};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_subjects(temp_dir: &TempDir) -> SharedSubjectStore {
        Rc::new(RefCell::new(JsonSubjectStore::open_at(
            temp_dir.path().join("subjects.json"),
        )))
    }

    fn coordinator_secs(seconds: i64, subjects: SharedSubjectStore) -> TimerCoordinator {
        TimerCoordinator::new(
            TimeValue::normalize(0, 0, seconds).unwrap(),
            TimerKind::FreeSession,
            None,
            subjects,
        )
    }

    #[test]
    fn test_initial_state() {
        let temp_dir = TempDir::new().unwrap();
        let coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        assert!(!coordinator.is_running());
        assert!(!coordinator.can_reset());
        assert!(!coordinator.is_finished());
        assert_eq!(coordinator.run_state(), RunState::Idle);
    }

    #[test]
    fn test_start_sets_flags_and_fires_callback() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        let changes = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&changes);
        coordinator.set_on_state_changed(Box::new(move |_| *counter.borrow_mut() += 1));

        coordinator.start();
        assert!(coordinator.is_running());
        assert!(coordinator.can_reset());
        assert_eq!(coordinator.run_state(), RunState::Running);
        assert_eq!(*changes.borrow(), 1);

        // Starting again is a no-op and fires nothing
        coordinator.start();
        assert_eq!(*changes.borrow(), 1);
    }

    #[test]
    fn test_pause_without_start_is_silent_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        let changes = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&changes);
        coordinator.set_on_state_changed(Box::new(move |_| *counter.borrow_mut() += 1));

        coordinator.pause();
        assert!(!coordinator.is_running());
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn test_toggle_twice_returns_to_original_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(30, test_subjects(&temp_dir));

        coordinator.toggle();
        assert!(coordinator.is_running());
        coordinator.toggle();
        assert!(!coordinator.is_running());
        assert_eq!(coordinator.run_state(), RunState::Paused);

        coordinator.toggle();
        assert!(coordinator.is_running());
    }

    #[test]
    fn test_stop_keeps_countdown_value() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(10, test_subjects(&temp_dir));

        coordinator.start();
        coordinator.decrement();
        coordinator.decrement();
        coordinator.stop();

        assert!(!coordinator.is_running());
        assert!(!coordinator.can_reset());
        assert_eq!(coordinator.countdown().remaining_seconds(), 8);
    }

    #[test]
    fn test_reset_restores_initial_value() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(10, test_subjects(&temp_dir));

        coordinator.start();
        coordinator.decrement();
        coordinator.reset();

        assert!(!coordinator.is_running());
        assert!(!coordinator.can_reset());
        assert!(coordinator.countdown().is_at_initial());
        assert_eq!(coordinator.run_state(), RunState::Idle);
    }

    #[test]
    fn test_decrement_ignored_while_not_running() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(10, test_subjects(&temp_dir));

        coordinator.decrement();
        assert_eq!(coordinator.countdown().remaining_seconds(), 10);
    }

    #[test]
    fn test_countdown_to_finish_fires_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        let finishes = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&finishes);
        coordinator.set_on_finished(Box::new(move |_| *counter.borrow_mut() += 1));

        coordinator.start();
        for _ in 0..4 {
            coordinator.decrement();
        }
        assert_eq!(coordinator.display(), "1");
        assert!(!coordinator.is_finished());

        coordinator.decrement();
        assert!(coordinator.is_finished());
        assert!(!coordinator.is_running());
        assert!(coordinator.can_reset());
        assert_eq!(coordinator.run_state(), RunState::Finished);
        assert_eq!(*finishes.borrow(), 1);

        // Further decrements change nothing
        coordinator.decrement();
        assert_eq!(*finishes.borrow(), 1);
    }

    #[test]
    fn test_start_after_finish_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(1, test_subjects(&temp_dir));

        coordinator.start();
        coordinator.decrement();
        assert!(coordinator.is_finished());

        coordinator.start();
        assert!(!coordinator.is_running());

        coordinator.toggle();
        assert!(!coordinator.is_running());
    }

    #[test]
    fn test_finish_credits_subject_with_initial_duration() {
        let temp_dir = TempDir::new().unwrap();
        let subjects = test_subjects(&temp_dir);

        let subject = Subject::new("Algebra".to_string(), Duration::from_secs(2 * 3600));
        let subject_id = subject.id;
        subjects.borrow_mut().save(subject).unwrap();

        let mut coordinator = TimerCoordinator::new(
            TimeValue::normalize(1, 0, 0).unwrap(),
            TimerKind::StudySession,
            Some(subject_id),
            Rc::clone(&subjects),
        );

        coordinator.start();
        // Pause midway; pause time must not affect the credited amount
        coordinator.decrement();
        coordinator.pause();
        coordinator.start();
        while !coordinator.is_finished() {
            coordinator.decrement();
        }

        let credited = subjects.borrow().find_by_id(subject_id).unwrap();
        assert_eq!(credited.time_spent, Duration::from_secs(3600));
        assert!(credited.last_study_date.is_some());
    }

    #[test]
    fn test_free_session_finish_touches_no_subject() {
        let temp_dir = TempDir::new().unwrap();
        let subjects = test_subjects(&temp_dir);

        let subject = Subject::new("Algebra".to_string(), Duration::from_secs(3600));
        let subject_id = subject.id;
        subjects.borrow_mut().save(subject).unwrap();

        let mut coordinator = coordinator_secs(2, Rc::clone(&subjects));
        coordinator.start();
        coordinator.decrement();
        coordinator.decrement();
        assert!(coordinator.is_finished());

        let untouched = subjects.borrow().find_by_id(subject_id).unwrap();
        assert_eq!(untouched.time_spent, Duration::ZERO);
    }

    #[test]
    fn test_reconfigure_replaces_baseline() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        coordinator.start();
        coordinator.decrement();

        coordinator
            .reconfigure(0, 10, 0, TimerKind::FreeSession, None)
            .unwrap();
        assert!(!coordinator.is_running());
        assert!(!coordinator.can_reset());
        assert_eq!(coordinator.countdown().remaining_seconds(), 600);
        assert!(coordinator.countdown().is_at_initial());
    }

    #[test]
    fn test_reconfigure_rejects_negative() {
        let temp_dir = TempDir::new().unwrap();
        let mut coordinator = coordinator_secs(5, test_subjects(&temp_dir));

        let result = coordinator.reconfigure(0, -1, 0, TimerKind::FreeSession, None);
        assert!(result.is_err());
        // The previous countdown survives a rejected reconfigure
        assert_eq!(coordinator.countdown().remaining_seconds(), 5);
    }

    #[test]
    fn test_display_formats() {
        let temp_dir = TempDir::new().unwrap();
        let subjects = test_subjects(&temp_dir);

        let hours = TimerCoordinator::new(
            TimeValue::normalize(1, 2, 3).unwrap(),
            TimerKind::FreeSession,
            None,
            Rc::clone(&subjects),
        );
        assert_eq!(hours.display(), "01:02:03");

        let minutes = TimerCoordinator::new(
            TimeValue::normalize(0, 12, 3).unwrap(),
            TimerKind::FreeSession,
            None,
            Rc::clone(&subjects),
        );
        assert_eq!(minutes.display(), "12:03");

        let seconds = coordinator_secs(7, subjects);
        assert_eq!(seconds.display(), "7");
    }

    #[test]
    fn test_from_record_restores_stopped() {
        let temp_dir = TempDir::new().unwrap();
        let subjects = test_subjects(&temp_dir);

        let mut original = coordinator_secs(10, Rc::clone(&subjects));
        original.start();
        original.decrement();

        let record = TimerRecord::from_countdown(original.id(), original.countdown());
        let restored = TimerCoordinator::from_record(record, subjects);

        assert_eq!(restored.id(), original.id());
        assert!(!restored.is_running());
        assert!(!restored.can_reset());
        assert_eq!(restored.countdown().remaining_seconds(), 9);
        assert_eq!(restored.countdown().initial().total_seconds(), 10);
    }
}
