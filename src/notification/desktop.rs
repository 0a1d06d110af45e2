//! Desktop notifications via `notify-rust`.
//!
//! On freedesktop systems the notification stays open until the user
//! responds, and the pressed button is reported back. Elsewhere the
//! notification is shown without a way to observe the response, which
//! counts as `Closed`.

use notify_rust::{Notification, Timeout};

use super::actions::NotificationResponse;
use super::content::PrayerNotification;
use super::error::NotificationError;
use super::NotificationSender;

/// Application name reported to the notification server.
pub const APP_NAME: &str = "Azaan";

/// Shows notifications on the user's desktop.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn build(&self, content: &PrayerNotification) -> Notification {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&content.title)
            .body(&content.body);

        for action in &content.actions {
            notification.action(action.id, action.title);
        }

        if content.require_interaction {
            notification.timeout(Timeout::Never);
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            notification.id(tag_id(&content.tag));
            if content.require_interaction {
                notification.hint(notify_rust::Hint::Resident(true));
            }
        }

        notification
    }
}

impl NotificationSender for DesktopNotifier {
    async fn show(
        &self,
        content: &PrayerNotification,
    ) -> Result<NotificationResponse, NotificationError> {
        let notification = self.build(content);
        let wait = !content.actions.is_empty();

        tokio::task::spawn_blocking(move || present(notification, wait))
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?
    }

    fn is_available(&self) -> bool {
        is_supported()
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn present(
    notification: Notification,
    wait: bool,
) -> Result<NotificationResponse, NotificationError> {
    let handle = notification
        .show()
        .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

    if !wait {
        return Ok(NotificationResponse::Closed);
    }

    let mut response = NotificationResponse::Closed;
    handle.wait_for_action(|id| {
        response = NotificationResponse::from_action_id(id);
    });
    Ok(response)
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn present(
    notification: Notification,
    _wait: bool,
) -> Result<NotificationResponse, NotificationError> {
    notification
        .show()
        .map(|_| NotificationResponse::Closed)
        .map_err(|e| NotificationError::SendFailed(e.to_string()))
}

/// Returns true if a notification server is reachable.
#[cfg(all(unix, not(target_os = "macos")))]
pub fn is_supported() -> bool {
    match notify_rust::get_server_information() {
        Ok(info) => {
            tracing::debug!(server = %info.name, version = %info.version, "notification server found");
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "no notification server");
            false
        }
    }
}

/// Returns true if a notification server is reachable.
#[cfg(not(all(unix, not(target_os = "macos"))))]
pub fn is_supported() -> bool {
    true
}

/// Derives a stable, non-zero replacement id from a tag so that
/// notifications with the same tag occupy one slot.
#[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
fn tag_id(tag: &str) -> u32 {
    // FNV-1a
    let hash = tag
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    hash.max(1)
}
