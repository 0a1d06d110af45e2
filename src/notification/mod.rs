//! Desktop notification system.
//!
//! This module provides:
//!
//! - Notification content for prayer times and the test notification
//! - The `play-azaan` / `dismiss` action buttons
//! - A `notify-rust` backend that reports which button was pressed
//! - The permission gate consulted before anything is shown
//!
//! # Example
//!
//! ```rust,ignore
//! use azaan::notification::{create_prayer_content, DesktopNotifier, NotificationSender};
//! use azaan::types::PrayerName;
//!
//! let notifier = DesktopNotifier::default();
//! let response = notifier.show(&create_prayer_content(PrayerName::Asr)).await?;
//! ```

mod actions;
mod content;
pub mod desktop;
pub mod error;
pub mod permission;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;

pub use self::actions::{action_ids, prayer_actions, ActionKind, NotificationAction, NotificationResponse};
pub use self::content::{
    create_prayer_content, create_test_content, NotificationContentBuilder, PrayerNotification,
    PRAYER_TAG, TEST_TAG,
};
pub use self::desktop::DesktopNotifier;
pub use self::error::NotificationError;
pub use self::permission::{
    MockPermissionPlatform, PermissionGate, PermissionPlatform, StoredPermission,
};

/// Shows notifications and reports how the user responded.
pub trait NotificationSender: Send + Sync + 'static {
    /// Shows `notification` and resolves once the user responds or the
    /// response can no longer be observed.
    fn show(
        &self,
        notification: &PrayerNotification,
    ) -> impl Future<Output = Result<NotificationResponse, NotificationError>> + Send;

    fn is_available(&self) -> bool;
}

impl<S: NotificationSender> NotificationSender for std::sync::Arc<S> {
    fn show(
        &self,
        notification: &PrayerNotification,
    ) -> impl Future<Output = Result<NotificationResponse, NotificationError>> + Send {
        (**self).show(notification)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Records shown notifications and replies with scripted responses.
///
/// In held mode every `show` stays pending until `release`, which answers
/// all of them with the same response. This mirrors a desktop server that
/// reports one action to every waiter on a replaced notification id.
#[derive(Debug)]
pub struct MockNotificationSender {
    shown: Mutex<Vec<PrayerNotification>>,
    responses: Mutex<VecDeque<NotificationResponse>>,
    available: AtomicBool,
    should_fail: AtomicBool,
    held: AtomicBool,
    release: broadcast::Sender<NotificationResponse>,
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationSender {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shown: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            available: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
            held: AtomicBool::new(false),
            release: broadcast::channel(16).0,
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Queues the response for the next shown notification. Without one
    /// the mock replies `Closed`.
    pub fn push_response(&self, response: NotificationResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Keeps later `show` calls pending until `release`.
    pub fn hold_responses(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Answers every pending `show` with `response`. Returns how many were
    /// waiting.
    pub fn release(&self, response: NotificationResponse) -> usize {
        self.release.send(response).unwrap_or(0)
    }

    fn record(&self, notification: &PrayerNotification) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(notification.clone());
        }
    }

    #[must_use]
    pub fn shown(&self) -> Vec<PrayerNotification> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.shown.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl NotificationSender for MockNotificationSender {
    async fn show(
        &self,
        notification: &PrayerNotification,
    ) -> Result<NotificationResponse, NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }

        let pending = self
            .held
            .load(Ordering::SeqCst)
            .then(|| self.release.subscribe());

        self.record(notification);

        if let Some(mut pending) = pending {
            return pending
                .recv()
                .await
                .map_err(|e| NotificationError::SendFailed(e.to_string()));
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or(NotificationResponse::Closed);
        Ok(response)
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
