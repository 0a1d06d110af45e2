//! Notification permission gate.
//!
//! The decision is a tri-state persisted on disk. A request prompts the user
//! only while the decision is undetermined; once denied it is never asked
//! again, and an unsupported system always reports `Denied`.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::PermissionStatus;

use super::desktop;
use super::error::NotificationError;

// ============================================================================
// PermissionPlatform
// ============================================================================

/// Where the permission decision lives and how the user is asked.
pub trait PermissionPlatform: Send + Sync {
    /// Whether this system can show notifications at all.
    fn is_supported(&self) -> bool;

    /// The stored decision.
    fn load(&self) -> PermissionStatus;

    /// Asks the user. `Undetermined` means the prompt was dismissed.
    fn prompt(&self) -> Result<PermissionStatus, NotificationError>;

    /// Persists a decision.
    fn save(&self, status: PermissionStatus) -> Result<(), NotificationError>;
}

// ============================================================================
// PermissionGate
// ============================================================================

/// Answers "may we notify?" and asks the user when undecided.
#[derive(Debug)]
pub struct PermissionGate<P: PermissionPlatform> {
    platform: P,
}

impl<P: PermissionPlatform> PermissionGate<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Current decision. `Denied` when unsupported.
    pub fn status(&self) -> PermissionStatus {
        if !self.is_supported() {
            return PermissionStatus::Denied;
        }
        self.platform.load()
    }

    /// Prompts only when undetermined and returns the resulting decision.
    ///
    /// Prompt failures are logged and leave the decision undetermined.
    pub fn request(&self) -> PermissionStatus {
        if !self.is_supported() {
            tracing::warn!("notifications are not supported on this system");
            return PermissionStatus::Denied;
        }

        let current = self.platform.load();
        if current != PermissionStatus::Undetermined {
            tracing::debug!(status = current.as_str(), "permission already decided");
            return current;
        }

        let decided = match self.platform.prompt() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "permission prompt failed");
                return PermissionStatus::Undetermined;
            }
        };

        if decided != PermissionStatus::Undetermined {
            if let Err(e) = self.platform.save(decided) {
                tracing::warn!(error = %e, "failed to persist permission decision");
            }
        }

        tracing::info!(status = decided.as_str(), "notification permission decided");
        decided
    }

    /// Succeeds only when notifications may be shown.
    pub fn ensure_granted(&self) -> Result<(), NotificationError> {
        if !self.is_supported() {
            return Err(NotificationError::UnsupportedPlatform);
        }
        if self.platform.load().is_granted() {
            Ok(())
        } else {
            Err(NotificationError::PermissionDenied)
        }
    }
}

// ============================================================================
// StoredPermission
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PermissionRecord {
    status: PermissionStatus,
    #[serde(default)]
    updated_at: i64,
}

/// Keeps the decision in a JSON file and asks on the terminal.
#[derive(Debug, Clone)]
pub struct StoredPermission {
    path: PathBuf,
}

impl StoredPermission {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PermissionPlatform for StoredPermission {
    fn is_supported(&self) -> bool {
        desktop::is_supported()
    }

    fn load(&self) -> PermissionStatus {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return PermissionStatus::Undetermined,
        };

        match serde_json::from_str::<PermissionRecord>(&raw) {
            Ok(record) => record.status,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable permission file");
                PermissionStatus::Undetermined
            }
        }
    }

    fn prompt(&self) -> Result<PermissionStatus, NotificationError> {
        let mut stderr = std::io::stderr();
        write!(stderr, "Allow Azaan to show prayer time notifications? [y/n] ")
            .and_then(|()| stderr.flush())
            .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))?;

        Ok(parse_answer(&answer))
    }

    fn save(&self, status: PermissionStatus) -> Result<(), NotificationError> {
        let record = PermissionRecord {
            status,
            updated_at: Utc::now().timestamp_millis(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))?;
        }
        std::fs::write(&self.path, json)
            .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))
    }
}

/// `y`/`yes` grants, `n`/`no` denies, anything else dismisses.
fn parse_answer(answer: &str) -> PermissionStatus {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => PermissionStatus::Granted,
        "n" | "no" => PermissionStatus::Denied,
        _ => PermissionStatus::Undetermined,
    }
}

// ============================================================================
// MockPermissionPlatform
// ============================================================================

/// In-memory platform with a scripted prompt answer.
#[derive(Debug)]
pub struct MockPermissionPlatform {
    supported: AtomicBool,
    status: Mutex<PermissionStatus>,
    answer: Mutex<PermissionStatus>,
    prompts: AtomicUsize,
}

impl Default for MockPermissionPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPermissionPlatform {
    /// Supported, undetermined, and answers `Granted` when asked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            status: Mutex::new(PermissionStatus::Undetermined),
            answer: Mutex::new(PermissionStatus::Granted),
            prompts: AtomicUsize::new(0),
        }
    }

    /// A platform that has already granted permission.
    #[must_use]
    pub fn granted() -> Self {
        let mock = Self::new();
        mock.set_status(PermissionStatus::Granted);
        mock
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: PermissionStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    pub fn set_answer(&self, answer: PermissionStatus) {
        if let Ok(mut guard) = self.answer.lock() {
            *guard = answer;
        }
    }

    /// How many times the user was asked.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl PermissionPlatform for MockPermissionPlatform {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    fn load(&self) -> PermissionStatus {
        self.status.lock().map(|s| *s).unwrap_or_default()
    }

    fn prompt(&self) -> Result<PermissionStatus, NotificationError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .map(|a| *a)
            .map_err(|e| NotificationError::AuthorizationFailed(e.to_string()))
    }

    fn save(&self, status: PermissionStatus) -> Result<(), NotificationError> {
        self.set_status(status);
        Ok(())
    }
}

impl<P: PermissionPlatform> PermissionPlatform for std::sync::Arc<P> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn load(&self) -> PermissionStatus {
        (**self).load()
    }

    fn prompt(&self) -> Result<PermissionStatus, NotificationError> {
        (**self).prompt()
    }

    fn save(&self, status: PermissionStatus) -> Result<(), NotificationError> {
        (**self).save(status)
    }
}

// ============================================================================
// Tests
// ============================================================================
