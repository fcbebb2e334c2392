//! Timers manager module
//!
//! This module provides centralized management of timer coordinators:
//! creation, removal, bulk operations, the derived active subset, and
//! write-through persistence of every state change.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::{anyhow, Result};

use crate::config::Config;
use crate::subject::store::SharedSubjectStore;
use crate::subject::SubjectId;

use super::{InvalidDuration, TimeValue, TimerCoordinator, TimerId, TimerKind, TimerRecord, TimerStore};

/// Callback slot for collection-level change notifications
pub type ManagerCallback = Box<dyn FnMut()>;

/// Internal event sent by coordinator callbacks into the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    StateChanged(TimerId),
    Finished(TimerId),
}

impl TimerEvent {
    fn timer_id(&self) -> TimerId {
        match self {
            TimerEvent::StateChanged(id) | TimerEvent::Finished(id) => *id,
        }
    }
}

/// Manages the collection of all timer coordinators
///
/// Every coordinator's callbacks are wired into an internal event
/// channel; state-changing operations drain it before returning, so the
/// active subset and the persisted records never lag a transition.
pub struct TimersManager {
    /// All coordinators, keyed by timer ID
    timers: HashMap<TimerId, TimerCoordinator>,
    /// Timer order (for stable listing)
    order: Vec<TimerId>,
    /// Derived subset: running or not yet finished
    active: Vec<TimerId>,
    /// Write-through persistence for countdown snapshots
    timer_store: Box<dyn TimerStore>,
    /// Shared subject store handed to each coordinator
    subjects: SharedSubjectStore,
    /// Application configuration
    config: Config,
    event_tx: Sender<TimerEvent>,
    event_rx: Receiver<TimerEvent>,
    on_timers_list_changed: Option<ManagerCallback>,
    on_active_timers_changed: Option<ManagerCallback>,
}

impl TimersManager {
    /// Create a manager, restoring every persisted timer
    ///
    /// Each restored record is wrapped in a fresh coordinator with
    /// callbacks wired identically to [`TimersManager::create_timer`].
    pub fn new(
        config: Config,
        timer_store: Box<dyn TimerStore>,
        subjects: SharedSubjectStore,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let mut manager = Self {
            timers: HashMap::new(),
            order: Vec::new(),
            active: Vec::new(),
            timer_store,
            subjects,
            config,
            event_tx,
            event_rx,
            on_timers_list_changed: None,
            on_active_timers_changed: None,
        };

        let records = manager.timer_store.find_all();
        if !records.is_empty() {
            tracing::info!(count = records.len(), "Restoring persisted timers");
        }
        for record in records {
            let mut coordinator =
                TimerCoordinator::from_record(record, SharedSubjectStore::clone(&manager.subjects));
            manager.wire_callbacks(&mut coordinator);
            let id = coordinator.id();
            manager.timers.insert(id, coordinator);
            manager.order.push(id);
        }
        manager.recompute_active();

        manager
    }

    /// Register the timers-list-changed callback
    pub fn set_on_timers_list_changed(&mut self, callback: ManagerCallback) {
        self.on_timers_list_changed = Some(callback);
    }

    /// Register the active-timers-changed callback
    pub fn set_on_active_timers_changed(&mut self, callback: ManagerCallback) {
        self.on_active_timers_changed = Some(callback);
    }

    /// Create a new timer with the given countdown configuration
    pub fn create_timer(
        &mut self,
        initial: TimeValue,
        kind: TimerKind,
        linked_subject: Option<SubjectId>,
    ) -> TimerId {
        let mut coordinator = TimerCoordinator::new(
            initial,
            kind,
            linked_subject,
            SharedSubjectStore::clone(&self.subjects),
        );
        self.wire_callbacks(&mut coordinator);

        let id = coordinator.id();
        tracing::debug!(timer_id = %id, kind = ?kind, "Created timer");
        self.timers.insert(id, coordinator);
        self.order.push(id);

        self.persist_timer(id);
        self.recompute_active();
        self.notify_list_changed();

        id
    }

    /// Create a new timer with the configured default duration
    pub fn create_default_timer(&mut self) -> TimerId {
        let initial = self.config.default_timer_value();
        self.create_timer(initial, TimerKind::FreeSession, None)
    }

    /// Remove a timer and delete its persisted record
    pub fn remove_timer(&mut self, id: TimerId) -> Result<()> {
        if self.timers.remove(&id).is_none() {
            return Err(anyhow!("Timer not found: {}", id));
        }
        self.order.retain(|&t| t != id);

        if let Err(e) = self.timer_store.delete_by_id(id) {
            tracing::warn!(timer_id = %id, error = %e, "Failed to delete persisted timer");
        }

        self.recompute_active();
        self.notify_list_changed();
        Ok(())
    }

    /// Remove every timer and delete all persisted records
    pub fn remove_all_timers(&mut self) {
        let ids: Vec<TimerId> = self.order.drain(..).collect();
        self.timers.clear();
        self.active.clear();

        for id in ids {
            if let Err(e) = self.timer_store.delete_by_id(id) {
                tracing::warn!(timer_id = %id, error = %e, "Failed to delete persisted timer");
            }
        }

        self.notify_active_changed();
        self.notify_list_changed();
    }

    /// Start a timer
    pub fn start(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.start();
        }
        self.drain_events();
    }

    /// Pause a timer
    pub fn pause(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.pause();
        }
        self.drain_events();
    }

    /// Toggle a timer between running and paused
    pub fn toggle(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.toggle();
        }
        self.drain_events();
    }

    /// Stop a timer without touching its countdown value
    pub fn stop(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.stop();
        }
        self.drain_events();
    }

    /// Reset a timer to its initial value
    pub fn reset(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.reset();
        }
        self.drain_events();
    }

    /// Advance one timer by one second
    pub fn decrement(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.get_mut(&id) {
            timer.decrement();
        }
        self.drain_events();
    }

    /// Replace a timer's countdown configuration
    pub fn reconfigure(
        &mut self,
        id: TimerId,
        hours: i64,
        minutes: i64,
        seconds: i64,
        kind: TimerKind,
        linked_subject: Option<SubjectId>,
    ) -> Result<()> {
        let timer = self
            .timers
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Timer not found: {}", id))?;
        let result: Result<(), InvalidDuration> =
            timer.reconfigure(hours, minutes, seconds, kind, linked_subject);
        self.drain_events();
        result?;
        Ok(())
    }

    /// Advance every running timer by one second
    ///
    /// Entry point for the external 1 Hz scheduler.
    pub fn tick(&mut self) {
        for id in self.order.clone() {
            if let Some(timer) = self.timers.get_mut(&id) {
                if timer.is_running() {
                    timer.decrement();
                }
            }
        }
        self.drain_events();
    }

    /// Pause every running timer
    pub fn pause_all_timers(&mut self) {
        for id in self.order.clone() {
            if let Some(timer) = self.timers.get_mut(&id) {
                if timer.is_running() {
                    timer.pause();
                }
            }
        }
        self.drain_events();
    }

    /// Stop every timer
    pub fn stop_all_timers(&mut self) {
        for id in self.order.clone() {
            if let Some(timer) = self.timers.get_mut(&id) {
                timer.stop();
            }
        }
        self.drain_events();
    }

    /// Get a timer by ID
    pub fn get(&self, id: TimerId) -> Option<&TimerCoordinator> {
        self.timers.get(&id)
    }

    /// Get all timers in creation order (snapshot)
    pub fn all_timers(&self) -> Vec<&TimerCoordinator> {
        self.order
            .iter()
            .filter_map(|id| self.timers.get(id))
            .collect()
    }

    /// Get the active timers: running or not yet finished (snapshot)
    pub fn active_timers(&self) -> Vec<&TimerCoordinator> {
        self.active
            .iter()
            .filter_map(|id| self.timers.get(id))
            .collect()
    }

    /// Get the total number of timers
    pub fn timers_count(&self) -> usize {
        self.timers.len()
    }

    /// Get the number of active timers
    pub fn active_timers_count(&self) -> usize {
        self.active.len()
    }

    /// Get the number of currently running timers
    pub fn running_timers_count(&self) -> usize {
        self.timers.values().filter(|t| t.is_running()).count()
    }

    /// Check if any timer is currently running
    pub fn has_running_timers(&self) -> bool {
        self.timers.values().any(|t| t.is_running())
    }

    /// Wire a coordinator's callbacks into the manager's event channel
    fn wire_callbacks(&self, coordinator: &mut TimerCoordinator) {
        let tx = self.event_tx.clone();
        coordinator.set_on_state_changed(Box::new(move |id| {
            let _ = tx.send(TimerEvent::StateChanged(id));
        }));

        let tx = self.event_tx.clone();
        coordinator.set_on_finished(Box::new(move |id| {
            let _ = tx.send(TimerEvent::Finished(id));
        }));
    }

    /// Process pending coordinator events
    ///
    /// Persists each changed coordinator once, recomputes the active
    /// subset, and fires the list-changed notification.
    fn drain_events(&mut self) {
        let mut changed: Vec<TimerId> = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            let id = event.timer_id();
            if !changed.contains(&id) {
                changed.push(id);
            }
        }

        if changed.is_empty() {
            return;
        }

        for id in changed {
            self.persist_timer(id);
        }
        self.recompute_active();
        self.notify_list_changed();
    }

    /// Persist one coordinator's countdown snapshot (best-effort)
    fn persist_timer(&mut self, id: TimerId) {
        let Some(timer) = self.timers.get(&id) else {
            return;
        };
        let record = TimerRecord::from_countdown(timer.id(), timer.countdown());
        if let Err(e) = self.timer_store.save(record) {
            tracing::warn!(timer_id = %id, error = %e, "Failed to persist timer state");
        }
    }

    /// Rebuild the active subset and notify
    fn recompute_active(&mut self) {
        self.active = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.timers
                    .get(id)
                    .map(|t| t.is_active())
                    .unwrap_or(false)
            })
            .collect();
        self.notify_active_changed();
    }

    fn notify_list_changed(&mut self) {
        if let Some(callback) = self.on_timers_list_changed.as_mut() {
            callback();
        }
    }

    fn notify_active_changed(&mut self) {
        if let Some(callback) = self.on_active_timers_changed.as_mut() {
            callback();
        }
    }
}
