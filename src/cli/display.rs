//! Display utilities for the azaan CLI.
//!
//! This module provides formatted output for:
//! - The daily prayer table with passed/current/next markers
//! - Daemon status and armed notifications
//! - Stored records
//! - The "now playing" banner
//! - Error messages with suggestions

use chrono::{DateTime, NaiveTime};

use crate::config::ConfigError;
use crate::notification::NotificationError;
use crate::prayer::{daily_rows, evaluate, PrayerRecord, PrayerRow, StoreError};
use crate::sound::SoundError;
use crate::types::{IpcResponse, PermissionStatus, PrayerName, PrayerTimeSet, ScheduledEntry};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the day's table and the countdown to the next prayer.
    pub fn show_day(times: &PrayerTimeSet, now: NaiveTime) {
        for row in daily_rows(times, now) {
            println!("{}", Self::format_row(&row));
        }
        println!();
        println!("{}", Self::format_next(times, now));
    }

    /// Shows a stored record.
    pub fn show_record(record: &PrayerRecord) {
        println!("{} - {}", record.date, record.masjid_name);
        println!("─────────────────────────────");
        for (prayer, time) in record.times.entries() {
            println!(
                "  {:<8} {:<8} {:>8}",
                prayer.display_name(),
                prayer.arabic_name(),
                time.to_12_hour()
            );
        }
    }

    /// Shows every stored date, one per line.
    pub fn show_records(records: &[PrayerRecord]) {
        if records.is_empty() {
            println!("No prayer times stored. Add some with 'azaan times set'");
            return;
        }
        for record in records {
            let times: Vec<String> = record
                .times
                .entries()
                .iter()
                .map(|(_, time)| time.to_string())
                .collect();
            println!("{}  {}  ({})", record.date, times.join(" "), record.masjid_name);
        }
    }

    /// Shows a success message after saving a record.
    pub fn show_saved(record: &PrayerRecord) {
        println!("* Saved prayer times for {}", record.date);
    }

    /// Shows a success message after changing a record.
    pub fn show_updated(record: &PrayerRecord) {
        println!("* Updated prayer times for {}", record.date);
    }

    /// Shows a success message after deleting a record.
    pub fn show_deleted(record: &PrayerRecord) {
        println!("* Deleted prayer times for {}", record.date);
    }

    /// Shows a success message for schedule.
    pub fn show_schedule_success(response: &IpcResponse) {
        println!("* {}", response.message);
        if let Some(scheduled) = response.data.as_ref().and_then(|d| d.scheduled.as_ref()) {
            for entry in scheduled {
                println!("  {}", Self::format_entry(entry));
            }
        }
    }

    /// Shows a success message for cancel.
    pub fn show_cancel_success(response: &IpcResponse) {
        println!("[] {}", response.message);
    }

    /// Shows the daemon's status.
    pub fn show_status(response: &IpcResponse) {
        println!("Azaan status");
        println!("─────────────────────────────");

        let Some(data) = &response.data else {
            println!("The daemon reported no status");
            return;
        };

        if let Some(permission) = data.permission {
            println!("Notifications: {}", Self::format_permission(permission));
        }

        match (data.current_prayer, data.next_prayer, &data.countdown) {
            (Some(current), Some(next), Some(countdown)) => {
                println!("Current: {}", current);
                println!("Next:    {} in {}", next, countdown);
            }
            _ => println!("No prayer times scheduled"),
        }

        if let Some(scheduled) = data.scheduled.as_ref().filter(|s| !s.is_empty()) {
            println!();
            println!("Armed notifications:");
            for entry in scheduled {
                println!("  {}", Self::format_entry(entry));
            }
        }
    }

    /// Shows the permission decision.
    pub fn show_permission(status: PermissionStatus) {
        println!("Notification permission: {}", Self::format_permission(status));
    }

    /// Shows the "now playing" banner.
    pub fn show_banner(prayer: PrayerName) {
        println!("♪ Playing azaan for {} ({})", prayer, prayer.arabic_name());
    }

    /// Clears the banner.
    pub fn hide_banner() {
        println!("  Azaan banner closed");
    }

    /// Shows a plain message.
    pub fn show_info(message: &str) {
        println!("{}", message);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Shows an error and, when one is known, how to fix it.
    pub fn show_failure(error: &anyhow::Error) {
        Self::show_error(&format!("{:#}", error));
        if let Some(hint) = Self::suggestion_for(error) {
            eprintln!("Hint: {}", hint);
        }
    }

    /// Finds a suggestion for the first known error in the chain.
    pub fn suggestion_for(error: &anyhow::Error) -> Option<&'static str> {
        error.chain().find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<StoreError>() {
                return Some(e.suggestion());
            }
            if let Some(e) = cause.downcast_ref::<ConfigError>() {
                return Some(e.suggestion());
            }
            if let Some(e) = cause.downcast_ref::<NotificationError>() {
                return Some(e.suggestion());
            }
            cause.downcast_ref::<SoundError>().map(SoundError::suggestion)
        })
    }

    /// Formats one table row: marker, names and 12-hour time.
    pub fn format_row(row: &PrayerRow) -> String {
        let marker = if row.is_next {
            "→"
        } else if row.is_current {
            "●"
        } else if row.is_passed {
            "✓"
        } else {
            " "
        };
        let prayer = row.slot.prayer;
        format!(
            "{} {:<8} {:<8} {:>8}",
            marker,
            prayer.display_name(),
            prayer.arabic_name(),
            row.slot.time.to_12_hour()
        )
    }

    /// Formats the next-prayer line.
    pub fn format_next(times: &PrayerTimeSet, now: NaiveTime) -> String {
        let status = evaluate(times, now);
        let when = if status.next_is_tomorrow {
            " (tomorrow)"
        } else {
            ""
        };
        format!(
            "Next: {} at {}{} - in {}",
            status.next.prayer,
            status.next.time.to_12_hour(),
            when,
            status.countdown()
        )
    }

    /// Formats an armed notification.
    pub fn format_entry(entry: &ScheduledEntry) -> String {
        let when = DateTime::parse_from_rfc3339(&entry.fire_at)
            .map(|t| t.format("%a %d %b %-I:%M %p").to_string())
            .unwrap_or_else(|_| entry.fire_at.clone());
        format!("{:<8} {}", entry.prayer.display_name(), when)
    }

    fn format_permission(status: PermissionStatus) -> &'static str {
        match status {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Undetermined => "not decided (run 'azaan permission request')",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
