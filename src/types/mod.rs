//! Core data types for the azaan daemon.
//!
//! This module defines the data structures used for:
//! - Prayer names and wall-clock prayer times
//! - The five-prayer `PrayerTimeSet` consumed by the scheduler
//! - IPC request/response serialization
//! - The envelope pushed from the daemon to foreground clients

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// PrayerName
// ============================================================================

/// One of the five daily prayers, in canonical sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// All prayers in canonical sequence.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Returns the lowercase key used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Returns the display label ("Fajr", "Dhuhr", ...).
    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    /// Returns the Arabic name shown next to the label.
    pub fn arabic_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "الفجر",
            PrayerName::Dhuhr => "الظهر",
            PrayerName::Asr => "العصر",
            PrayerName::Maghrib => "المغرب",
            PrayerName::Isha => "العشاء",
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PrayerName {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrayerName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseTimeError::UnknownPrayer(s.to_string()))
    }
}

// ============================================================================
// ParseTimeError
// ============================================================================

/// Errors produced while parsing prayer names and times.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseTimeError {
    /// The value is not in `HH:MM` form.
    #[error("invalid time '{0}': expected HH:MM (24-hour)")]
    InvalidFormat(String),

    /// Hour or minute out of range.
    #[error("time '{0}' is out of range")]
    OutOfRange(String),

    /// Not one of the five prayer names.
    #[error("unknown prayer '{0}'")]
    UnknownPrayer(String),
}

// ============================================================================
// PrayerTime
// ============================================================================

/// A wall-clock time of day with minute resolution, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrayerTime(NaiveTime);

impl PrayerTime {
    /// Creates a prayer time from hour and minute.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Returns the underlying time of day.
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Minutes since local midnight.
    pub fn minutes_of_day(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    /// Formats the time in 12-hour form, e.g. `5:30 AM`.
    pub fn to_12_hour(&self) -> String {
        let hour = self.0.hour();
        let period = if hour >= 12 { "PM" } else { "AM" };
        let hour12 = match hour {
            0 => 12,
            h if h > 12 => h - 12,
            h => h,
        };
        format!("{}:{:02} {}", hour12, self.0.minute(), period)
    }
}

impl From<NaiveTime> for PrayerTime {
    fn from(time: NaiveTime) -> Self {
        // Minute resolution only
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }
}

impl fmt::Display for PrayerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for PrayerTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (hours, minutes) = trimmed
            .split_once(':')
            .ok_or_else(|| ParseTimeError::InvalidFormat(s.to_string()))?;

        let parse = |part: &str| -> Result<u32, ParseTimeError> {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(ParseTimeError::InvalidFormat(s.to_string()));
            }
            part.parse()
                .map_err(|_| ParseTimeError::InvalidFormat(s.to_string()))
        };

        let hours = parse(hours)?;
        let minutes = parse(minutes)?;

        PrayerTime::from_hm(hours, minutes).ok_or_else(|| ParseTimeError::OutOfRange(s.to_string()))
    }
}

impl Serialize for PrayerTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrayerTime {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PrayerTimeSet
// ============================================================================

/// The five prayer times for one day.
///
/// All five must be present for the set to deserialize. Values are not
/// required to be in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimeSet {
    pub fajr: PrayerTime,
    pub dhuhr: PrayerTime,
    pub asr: PrayerTime,
    pub maghrib: PrayerTime,
    pub isha: PrayerTime,
}

impl PrayerTimeSet {
    /// Returns the time for the given prayer.
    pub fn get(&self, prayer: PrayerName) -> PrayerTime {
        match prayer {
            PrayerName::Fajr => self.fajr,
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Asr => self.asr,
            PrayerName::Maghrib => self.maghrib,
            PrayerName::Isha => self.isha,
        }
    }

    /// Returns `(prayer, time)` pairs in canonical sequence.
    pub fn entries(&self) -> [(PrayerName, PrayerTime); 5] {
        PrayerName::ALL.map(|p| (p, self.get(p)))
    }

    /// Parses a set from five `HH:MM` strings in canonical order.
    pub fn parse(
        fajr: &str,
        dhuhr: &str,
        asr: &str,
        maghrib: &str,
        isha: &str,
    ) -> Result<Self, ParseTimeError> {
        Ok(Self {
            fajr: fajr.parse()?,
            dhuhr: dhuhr.parse()?,
            asr: asr.parse()?,
            maghrib: maghrib.parse()?,
            isha: isha.parse()?,
        })
    }
}

// ============================================================================
// PermissionStatus
// ============================================================================

/// Notification permission as decided on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not yet decided; a request will prompt.
    #[default]
    Undetermined,
}

impl PermissionStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Undetermined => "undetermined",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

// ============================================================================
// Bridge envelope
// ============================================================================

/// Action requested by a play message. Only `play` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeAction {
    Play,
}

/// Payload of a `play_azaan` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayPayload {
    pub action: BridgeAction,
    pub prayer: PrayerName,
}

/// Envelope pushed from the daemon to a foreground client.
///
/// Serialized as `{"kind": ..., "payload": ...}`, one JSON object per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// Play the call to prayer.
    PlayAzaan(PlayPayload),
    /// Bring the client to the user's attention.
    Focus,
}

impl BridgeMessage {
    /// Creates a play message for the given prayer.
    pub fn play(prayer: PrayerName) -> Self {
        BridgeMessage::PlayAzaan(PlayPayload {
            action: BridgeAction::Play,
            prayer,
        })
    }
}

/// Event raised in the foreground once the azaan started playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzaanEvent {
    Playing { prayer: PrayerName },
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Replace the armed timers with the given set
    Schedule {
        /// Today's prayer times
        times: PrayerTimeSet,
    },
    /// Cancel every armed timer
    Cancel,
    /// Query armed timers and the current/next prayer
    Status,
    /// Register as a foreground client and stream bridge messages
    Watch,
    /// Show a test notification immediately
    TestNotification,
}

/// One armed timer as reported over IPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub prayer: PrayerName,
    /// RFC 3339 fire instant
    #[serde(rename = "fireAt")]
    pub fire_at: String,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Armed timers, earliest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<Vec<ScheduledEntry>>,
    /// Times the timers were armed from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<PrayerTimeSet>,
    /// Current prayer
    #[serde(rename = "currentPrayer", skip_serializing_if = "Option::is_none")]
    pub current_prayer: Option<PrayerName>,
    /// Next prayer
    #[serde(rename = "nextPrayer", skip_serializing_if = "Option::is_none")]
    pub next_prayer: Option<PrayerName>,
    /// Countdown to the next prayer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<String>,
    /// Notification permission seen by the daemon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionStatus>,
    /// Foreground client id assigned on watch
    #[serde(rename = "clientId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
