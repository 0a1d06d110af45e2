//! Notification scheduler.
//!
//! Arms one delay timer per prayer. Each timer is a tokio task that sleeps
//! until its fire instant and then sends a `FireEvent` to the presenter.
//! The timer table is keyed by prayer, so rescheduling replaces entries
//! rather than accumulating them.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::types::{PrayerName, PrayerTimeSet, ScheduledEntry};

use super::clock::{fire_instant, Clock};

// ============================================================================
// FireEvent
// ============================================================================

/// Sent when a prayer's timer elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireEvent {
    pub prayer: PrayerName,
    pub fire_at: DateTime<FixedOffset>,
}

// ============================================================================
// ScheduledNotification
// ============================================================================

/// One armed timer.
#[derive(Debug)]
pub struct ScheduledNotification {
    pub prayer: PrayerName,
    pub fire_at: DateTime<FixedOffset>,
    handle: JoinHandle<()>,
}

impl ScheduledNotification {
    /// Returns true while the timer has not fired or been cancelled.
    pub fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    fn to_entry(&self) -> ScheduledEntry {
        ScheduledEntry {
            prayer: self.prayer,
            fire_at: self.fire_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// NotificationScheduler
// ============================================================================

/// Owns the timer table. Share it as `Arc<tokio::sync::Mutex<_>>` so that
/// `schedule` and `cancel_all` are serialized.
pub struct NotificationScheduler<C: Clock> {
    clock: C,
    timers: HashMap<PrayerName, ScheduledNotification>,
    times: Option<PrayerTimeSet>,
    fire_tx: mpsc::UnboundedSender<FireEvent>,
}

impl<C: Clock> NotificationScheduler<C> {
    /// Creates a scheduler that reports elapsed timers on `fire_tx`.
    pub fn new(clock: C, fire_tx: mpsc::UnboundedSender<FireEvent>) -> Self {
        Self {
            clock,
            timers: HashMap::new(),
            times: None,
            fire_tx,
        }
    }

    /// Replaces every armed timer with one timer per prayer in `times`.
    ///
    /// Must be called from within a tokio runtime. Returns the armed
    /// entries, earliest first.
    pub fn schedule(&mut self, times: PrayerTimeSet) -> Vec<ScheduledEntry> {
        self.clear();

        let now = self.clock.now();
        for (prayer, time) in times.entries() {
            let fire_at = fire_instant(time, &now);
            let delay = fire_at
                .clone()
                .signed_duration_since(now.clone())
                .to_std()
                .unwrap_or(Duration::ZERO);
            let fire_at = fire_at.fixed_offset();

            tracing::debug!(
                prayer = %prayer,
                fire_at = %fire_at.to_rfc3339(),
                delay_secs = delay.as_secs(),
                "arming prayer timer"
            );

            let fire_tx = self.fire_tx.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::info!(prayer = %prayer, "prayer time reached");
                if fire_tx.send(FireEvent { prayer, fire_at }).is_err() {
                    tracing::warn!(prayer = %prayer, "presenter is gone, dropping fire event");
                }
            });

            self.timers.insert(
                prayer,
                ScheduledNotification {
                    prayer,
                    fire_at,
                    handle,
                },
            );
        }

        self.times = Some(times);
        let entries = self.scheduled();
        tracing::info!(count = entries.len(), "prayer notifications scheduled");
        entries
    }

    /// Aborts every armed timer.
    pub fn cancel_all(&mut self) {
        let count = self.live_timers();
        self.clear();
        self.times = None;
        tracing::info!(count, "prayer notifications cancelled");
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn live_timers(&self) -> usize {
        self.timers.values().filter(|t| t.is_live()).count()
    }

    /// Live timers, earliest first.
    pub fn scheduled(&self) -> Vec<ScheduledEntry> {
        let mut live: Vec<&ScheduledNotification> =
            self.timers.values().filter(|t| t.is_live()).collect();
        live.sort_by_key(|t| t.fire_at);
        live.into_iter().map(ScheduledNotification::to_entry).collect()
    }

    /// The set the timers were last armed from.
    pub fn times(&self) -> Option<PrayerTimeSet> {
        self.times
    }

    /// Returns the current time according to the scheduler's clock.
    pub fn now(&self) -> DateTime<C::Tz> {
        self.clock.now()
    }

    fn clear(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }
}

impl<C: Clock> Drop for NotificationScheduler<C> {
    fn drop(&mut self) {
        self.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
