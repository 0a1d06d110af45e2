//! Notification action definitions.
//!
//! Prayer notifications carry exactly two buttons. The primary one asks the
//! foreground client to play the azaan; the other dismisses.

/// Notification action identifiers.
pub mod action_ids {
    /// Play the azaan in a foreground client.
    pub const PLAY_AZAAN: &str = "play-azaan";
    /// Close the notification without further effect.
    pub const DISMISS: &str = "dismiss";
    /// Reported by the desktop backend when the body is clicked.
    pub const DEFAULT: &str = "default";
    /// Reported by the desktop backend when the notification closes.
    pub const CLOSED: &str = "__closed";
}

/// A button shown on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: &'static str,
    pub title: &'static str,
}

/// Buttons of a prayer notification, primary first.
#[must_use]
pub fn prayer_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction {
            id: action_ids::PLAY_AZAAN,
            title: "Play Azaan",
        },
        NotificationAction {
            id: action_ids::DISMISS,
            title: "Dismiss",
        },
    ]
}

/// Which button the user pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    PlayAzaan,
    Dismiss,
}

impl ActionKind {
    /// Maps an action identifier to a known button.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            action_ids::PLAY_AZAAN => Some(Self::PlayAzaan),
            action_ids::DISMISS => Some(Self::Dismiss),
            _ => None,
        }
    }
}

/// How the user responded to a shown notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationResponse {
    /// One of the buttons was pressed.
    Action(ActionKind),
    /// The notification body was clicked.
    Clicked,
    /// Closed, expired, or no interaction could be observed.
    Closed,
}

impl NotificationResponse {
    /// Interprets an identifier reported by the desktop backend.
    pub fn from_action_id(id: &str) -> Self {
        match id {
            action_ids::DEFAULT => Self::Clicked,
            action_ids::CLOSED => Self::Closed,
            other => ActionKind::from_id(other).map_or(Self::Closed, Self::Action),
        }
    }
}
