//! Command definitions for the azaan CLI.
//!
//! Uses clap derive macro for argument parsing.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::types::{ParseTimeError, PrayerName, PrayerTime, PrayerTimeSet};

// ============================================================================
// CLI Structure
// ============================================================================

/// Azaan - prayer time notifications for the desktop
#[derive(Parser, Debug)]
#[command(
    name = "azaan",
    version,
    about = "Prayer time notifications with an azaan player",
    long_about = "Keeps the five daily prayer times, shows a desktop notification \
                  when each one is reached and plays the azaan on request.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the background service
    Daemon,

    /// Arm notifications for a day's prayer times
    Schedule(ScheduleArgs),

    /// Cancel every armed notification
    Cancel,

    /// Show armed notifications and the current prayer
    Status,

    /// Show the current and next prayer from stored times
    Next(NextArgs),

    /// Run a foreground client that plays the azaan on request
    Watch {
        /// Play the azaan for this prayer right away
        #[arg(long, value_name = "PRAYER")]
        play: Option<PrayerName>,
    },

    /// Inspect or request notification permission
    Permission {
        #[command(subcommand)]
        action: Option<PermissionAction>,
    },

    /// Manage stored prayer times
    #[command(subcommand)]
    Times(TimesCommand),

    /// Show a test notification
    TestNotification,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Permission subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    /// Show the stored decision
    Status,
    /// Ask for permission if not decided yet
    Request,
}

/// Store subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TimesCommand {
    /// Add or replace the times for a date
    Set(SetTimesArgs),
    /// Change some times or the masjid of a stored date
    Update(SetTimesArgs),
    /// Show the times for a date
    Show(DateArg),
    /// List every stored date
    List,
    /// Delete the times for a date
    Delete(DateArg),
}

// ============================================================================
// Arguments
// ============================================================================

/// The five prayer times as `HH:MM`
#[derive(Args, Debug, Clone, Default)]
pub struct TimeArgs {
    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub fajr: Option<PrayerTime>,

    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub dhuhr: Option<PrayerTime>,

    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub asr: Option<PrayerTime>,

    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub maghrib: Option<PrayerTime>,

    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub isha: Option<PrayerTime>,
}

impl TimeArgs {
    /// Returns the set when all five are given.
    pub fn to_set(&self) -> Option<PrayerTimeSet> {
        Some(PrayerTimeSet {
            fajr: self.fajr?,
            dhuhr: self.dhuhr?,
            asr: self.asr?,
            maghrib: self.maghrib?,
            isha: self.isha?,
        })
    }

    /// Overrides the given times in `times`, keeping the rest.
    pub fn apply_to(&self, times: PrayerTimeSet) -> PrayerTimeSet {
        PrayerTimeSet {
            fajr: self.fajr.unwrap_or(times.fajr),
            dhuhr: self.dhuhr.unwrap_or(times.dhuhr),
            asr: self.asr.unwrap_or(times.asr),
            maghrib: self.maghrib.unwrap_or(times.maghrib),
            isha: self.isha.unwrap_or(times.isha),
        }
    }

    /// True when at least one time was given.
    pub fn any(&self) -> bool {
        self.fajr.is_some()
            || self.dhuhr.is_some()
            || self.asr.is_some()
            || self.maghrib.is_some()
            || self.isha.is_some()
    }
}

/// Arguments for the schedule command
#[derive(Args, Debug, Clone, Default)]
pub struct ScheduleArgs {
    /// Use the stored times for this date (default: today)
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with_all = ["fajr", "dhuhr", "asr", "maghrib", "isha"])]
    pub date: Option<NaiveDate>,

    #[command(flatten)]
    pub times: TimeArgs,
}

/// Arguments for the next command
#[derive(Args, Debug, Clone, Default)]
pub struct NextArgs {
    /// Date whose times are used (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Evaluate at this time instead of now
    #[arg(long, value_name = "HH:MM", value_parser = parse_prayer_time)]
    pub now: Option<PrayerTime>,
}

/// Arguments for `times set` and `times update`
#[derive(Args, Debug, Clone)]
pub struct SetTimesArgs {
    /// Date the times apply to (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Masjid name stored with the record
    #[arg(long)]
    pub masjid: Option<String>,

    #[command(flatten)]
    pub times: TimeArgs,
}

/// A single date argument
#[derive(Args, Debug, Clone, Default)]
pub struct DateArg {
    /// Date (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses a strict `HH:MM` time.
fn parse_prayer_time(s: &str) -> Result<PrayerTime, ParseTimeError> {
    s.parse()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["azaan"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["azaan", "-v", "status"]);
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Status)));
        }

        #[test]
        fn test_parse_daemon_and_cancel() {
            assert!(matches!(
                Cli::parse_from(["azaan", "daemon"]).command,
                Some(Commands::Daemon)
            ));
            assert!(matches!(
                Cli::parse_from(["azaan", "cancel"]).command,
                Some(Commands::Cancel)
            ));
        }

        #[test]
        fn test_parse_test_notification() {
            let cli = Cli::parse_from(["azaan", "test-notification"]);
            assert!(matches!(cli.command, Some(Commands::TestNotification)));
        }
    }

    // ------------------------------------------------------------------------
    // Schedule / Next Tests
    // ------------------------------------------------------------------------

    mod schedule_tests {
        use super::*;

        #[test]
        fn test_parse_schedule_with_times() {
            let cli = Cli::parse_from([
                "azaan", "schedule", "--fajr", "05:30", "--dhuhr", "12:30", "--asr", "15:45",
                "--maghrib", "18:15", "--isha", "19:30",
            ]);
            let Some(Commands::Schedule(args)) = cli.command else {
                panic!("Expected Schedule command");
            };
            let set = args.times.to_set().unwrap();
            assert_eq!(set.asr.to_string(), "15:45");
            assert!(args.date.is_none());
        }

        #[test]
        fn test_parse_schedule_partial_times() {
            let cli = Cli::parse_from(["azaan", "schedule", "--fajr", "05:30"]);
            let Some(Commands::Schedule(args)) = cli.command else {
                panic!("Expected Schedule command");
            };
            assert!(args.times.any());
            assert!(args.times.to_set().is_none());
        }

        #[test]
        fn test_schedule_date_conflicts_with_times() {
            let result = Cli::try_parse_from([
                "azaan",
                "schedule",
                "--date",
                "2025-06-15",
                "--fajr",
                "05:30",
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_rejects_invalid_time() {
            assert!(Cli::try_parse_from(["azaan", "schedule", "--fajr", "dawn"]).is_err());
            assert!(Cli::try_parse_from(["azaan", "next", "--now", "24:00"]).is_err());
        }

        #[test]
        fn test_parse_next() {
            let cli = Cli::parse_from(["azaan", "next", "--date", "2025-06-15", "--now", "14:00"]);
            let Some(Commands::Next(args)) = cli.command else {
                panic!("Expected Next command");
            };
            assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 6, 15));
            assert_eq!(args.now, PrayerTime::from_hm(14, 0));
        }
    }

    // ------------------------------------------------------------------------
    // Watch / Permission / Times Tests
    // ------------------------------------------------------------------------

    mod subcommand_tests {
        use super::*;

        #[test]
        fn test_parse_watch_play() {
            let cli = Cli::parse_from(["azaan", "watch", "--play", "Maghrib"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Watch {
                    play: Some(PrayerName::Maghrib)
                })
            ));
            assert!(Cli::try_parse_from(["azaan", "watch", "--play", "sunrise"]).is_err());
        }

        #[test]
        fn test_parse_permission() {
            let cli = Cli::parse_from(["azaan", "permission", "request"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Permission {
                    action: Some(PermissionAction::Request)
                })
            ));

            let cli = Cli::parse_from(["azaan", "permission"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Permission { action: None })
            ));
        }

        #[test]
        fn test_parse_times_set() {
            let cli = Cli::parse_from([
                "azaan", "times", "set", "--date", "2025-06-15", "--masjid", "Al-Noor", "--fajr",
                "05:30", "--dhuhr", "12:30", "--asr", "15:45", "--maghrib", "18:15", "--isha",
                "19:30",
            ]);
            let Some(Commands::Times(TimesCommand::Set(args))) = cli.command else {
                panic!("Expected times set");
            };
            assert_eq!(args.masjid.as_deref(), Some("Al-Noor"));
            assert!(args.times.to_set().is_some());
        }

        #[test]
        fn test_parse_times_update_partial() {
            let cli = Cli::parse_from([
                "azaan", "times", "update", "--date", "2025-06-15", "--asr", "15:50",
            ]);
            let Some(Commands::Times(TimesCommand::Update(args))) = cli.command else {
                panic!("Expected times update");
            };
            assert!(args.masjid.is_none());
            assert!(args.times.to_set().is_none());

            let base = PrayerTimeSet::parse("05:30", "12:30", "15:45", "18:15", "19:30").unwrap();
            let updated = args.times.apply_to(base);
            assert_eq!(updated.asr, "15:50".parse::<PrayerTime>().unwrap());
            assert_eq!(updated.fajr, base.fajr);
            assert_eq!(updated.isha, base.isha);
        }

        #[test]
        fn test_parse_times_list_and_delete() {
            assert!(matches!(
                Cli::parse_from(["azaan", "times", "list"]).command,
                Some(Commands::Times(TimesCommand::List))
            ));
            assert!(matches!(
                Cli::parse_from(["azaan", "times", "delete", "--date", "2025-06-15"]).command,
                Some(Commands::Times(TimesCommand::Delete(_)))
            ));
        }

        #[test]
        fn test_parse_completions() {
            let cli = Cli::parse_from(["azaan", "completions", "bash"]);
            assert!(matches!(cli.command, Some(Commands::Completions { .. })));
        }
    }
}
