//! Notification system error types.
//!
//! None of these errors escape the presenter: a denied permission or an
//! unsupported platform turns a fire event into a logged no-op.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Asking the user for permission failed.
    #[error("Failed to request notification permission: {0}")]
    AuthorizationFailed(String),

    /// The notification could not be shown.
    #[error("Failed to show notification: {0}")]
    SendFailed(String),

    /// Notification permission is not granted.
    #[error("Notification permission has not been granted")]
    PermissionDenied,

    /// This platform has no notification service.
    #[error("Notifications are not supported on this system")]
    UnsupportedPlatform,
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::AuthorizationFailed(_))
    }

    /// Returns true if notifications can never work on this system.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform)
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::AuthorizationFailed(_) => "run 'azaan permission request' from a terminal",
            Self::PermissionDenied => {
                "run 'azaan permission request', or edit permission.json if you denied it before"
            }
            Self::SendFailed(_) => "check that a notification daemon is running",
            Self::UnsupportedPlatform => "start a notification server for your desktop session",
        }
    }
}
