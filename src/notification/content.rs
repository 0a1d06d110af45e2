//! Notification content construction.
//!
//! This module provides a builder for creating notification content
//! with a fluent API, plus the two notifications the daemon shows.

use crate::types::PrayerName;

use super::actions::{prayer_actions, NotificationAction};

/// Tag shared by every prayer notification. A new one replaces the old.
pub const PRAYER_TAG: &str = "prayer-notification";

/// Tag of the test notification.
pub const TEST_TAG: &str = "test-notification";

/// Platform-independent notification content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerNotification {
    pub title: String,
    pub body: String,
    pub tag: String,
    /// Stay visible until the user interacts.
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    /// Prayer the notification announces, if any.
    pub prayer: Option<PrayerName>,
}

/// Builder for constructing notification content.
#[derive(Debug, Default)]
pub struct NotificationContentBuilder {
    title: String,
    body: String,
    tag: String,
    require_interaction: bool,
    actions: Vec<NotificationAction>,
    prayer: Option<PrayerName>,
}

impl NotificationContentBuilder {
    /// Creates a new notification content builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = sanitize(&body.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn require_interaction(mut self, require: bool) -> Self {
        self.require_interaction = require;
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: Vec<NotificationAction>) -> Self {
        self.actions = actions;
        self
    }

    #[must_use]
    pub fn prayer(mut self, prayer: PrayerName) -> Self {
        self.prayer = Some(prayer);
        self
    }

    /// Builds and returns the notification content.
    #[must_use]
    pub fn build(self) -> PrayerNotification {
        PrayerNotification {
            title: self.title,
            body: self.body,
            tag: self.tag,
            require_interaction: self.require_interaction,
            actions: self.actions,
            prayer: self.prayer,
        }
    }
}

/// Strips control characters, keeping newlines.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect()
}

/// Creates the notification shown when a prayer's time is reached.
#[must_use]
pub fn create_prayer_content(prayer: PrayerName) -> PrayerNotification {
    NotificationContentBuilder::new()
        .title(format!("{} Prayer Time", prayer))
        .body(format!("It's time for {} prayer", prayer))
        .tag(PRAYER_TAG)
        .require_interaction(true)
        .actions(prayer_actions())
        .prayer(prayer)
        .build()
}

/// Creates the notification used to check that delivery works.
#[must_use]
pub fn create_test_content() -> PrayerNotification {
    NotificationContentBuilder::new()
        .title("Azaan Test")
        .body("Notifications are working correctly!")
        .tag(TEST_TAG)
        .require_interaction(false)
        .build()
}
