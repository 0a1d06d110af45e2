//! Azaan Library
//!
//! This library provides the core functionality for the azaan CLI.
//! It includes:
//! - Prayer time types and the time-of-day evaluator
//! - A date-keyed store of prayer times
//! - The notification scheduler, presenter and client router run by the daemon
//! - IPC server/client for daemon-CLI communication
//! - Desktop notifications with Play Azaan / Dismiss actions
//! - The foreground bridge that plays the azaan
//! - Configuration and CLI utilities

pub mod bridge;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod prayer;
pub mod sound;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    AzaanEvent, BridgeMessage, IpcRequest, IpcResponse, PermissionStatus, PrayerName, PrayerTime,
    PrayerTimeSet, ResponseData,
};

pub use config::{AzaanConfig, ConfigError};

pub use prayer::{evaluate, format_countdown, PrayerRecord, PrayerStatus, PrayerTimeStore, StoreError};

pub use notification::{
    MockNotificationSender, NotificationError, NotificationSender, PermissionGate,
};

pub use sound::{MockSoundPlayer, RodioSoundPlayer, SoundError, SoundPlayer, SoundSource};

pub use bridge::{Banner, ForegroundBridge};
