//! Azaan CLI - prayer time notifications for the desktop
//!
//! Keeps the five daily prayer times, notifies when each one is reached
//! and plays the azaan when the user asks for it:
//! - `azaan daemon` runs the scheduler in the background
//! - `azaan watch` is the foreground client that plays the azaan
//! - `azaan times` manages the stored prayer times

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};

use azaan::bridge::{Banner, ForegroundBridge};
use azaan::cli::{
    Cli, Commands, Display, IpcClient, PermissionAction, ScheduleArgs, SetTimesArgs, TimesCommand,
};
use azaan::config::AzaanConfig;
use azaan::notification::{PermissionGate, StoredPermission};
use azaan::prayer::{PrayerRecord, PrayerTimeStore, StoreError};
use azaan::sound::{try_create_player, NoAudio, SoundPlayer, SoundSource};
use azaan::types::{AzaanEvent, PrayerName, PrayerTimeSet};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_failure(&e);
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        generate_completions(shell);
        return Ok(());
    }

    let config = AzaanConfig::load()?;
    let client = IpcClient::with_socket_path(config.socket_path());
    let store = PrayerTimeStore::new(config.store_path());

    match command {
        Commands::Daemon => {
            azaan::daemon::run(config).await?;
        }
        Commands::Schedule(args) => {
            let times = schedule_times(&store, &args)?;
            let response = client.schedule(times).await?;
            Display::show_schedule_success(&response);
        }
        Commands::Cancel => {
            let response = client.cancel().await?;
            Display::show_cancel_success(&response);
        }
        Commands::Status => {
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Commands::Next(args) => {
            let date = args.date.unwrap_or_else(today);
            let times = store.times_for(date)?;
            let now = args
                .now
                .map(|t| t.time())
                .unwrap_or_else(|| Local::now().time());
            Display::show_day(&times, now);
        }
        Commands::Watch { play } => {
            run_watch(&config, &client, play).await?;
        }
        Commands::Permission { action } => {
            let gate = PermissionGate::new(StoredPermission::new(config.permission_path()));
            let status = match action.unwrap_or(PermissionAction::Status) {
                PermissionAction::Status => gate.status(),
                PermissionAction::Request => gate.request(),
            };
            Display::show_permission(status);
        }
        Commands::Times(command) => {
            run_times(&config, &store, command)?;
        }
        Commands::TestNotification => {
            let response = client.test_notification().await?;
            Display::show_info(&response.message);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Times given on the command line, else the stored record for the date.
fn schedule_times(store: &PrayerTimeStore, args: &ScheduleArgs) -> Result<PrayerTimeSet> {
    if args.times.any() {
        return args
            .times
            .to_set()
            .context("All five times are required: --fajr --dhuhr --asr --maghrib --isha");
    }

    let date = args.date.unwrap_or_else(today);
    Ok(store.times_for(date)?)
}

/// Store management.
fn run_times(config: &AzaanConfig, store: &PrayerTimeStore, command: TimesCommand) -> Result<()> {
    match command {
        TimesCommand::Set(SetTimesArgs {
            date,
            masjid,
            times,
        }) => {
            let times = times
                .to_set()
                .context("All five times are required: --fajr --dhuhr --asr --maghrib --isha")?;
            let masjid = masjid.unwrap_or_else(|| config.masjid_name.clone());
            let record = store.add(PrayerRecord::new(date.unwrap_or_else(today), times, masjid))?;
            Display::show_saved(&record);
        }
        TimesCommand::Update(SetTimesArgs {
            date,
            masjid,
            times,
        }) => {
            if !times.any() && masjid.is_none() {
                anyhow::bail!("Nothing to update: give at least one time or --masjid");
            }
            let date = date.unwrap_or_else(today);
            let mut record = store.get(date)?.ok_or(StoreError::NotFound(date))?;
            record.times = times.apply_to(record.times);
            if let Some(masjid) = masjid {
                record.masjid_name = masjid;
            }
            let record = store.update(record)?;
            Display::show_updated(&record);
        }
        TimesCommand::Show(arg) => {
            let date = arg.date.unwrap_or_else(today);
            let record = store.get(date)?.ok_or(StoreError::NotFound(date))?;
            Display::show_record(&record);
        }
        TimesCommand::List => {
            Display::show_records(&store.list()?);
        }
        TimesCommand::Delete(arg) => {
            let record = store.delete(arg.date.unwrap_or_else(today))?;
            Display::show_deleted(&record);
        }
    }
    Ok(())
}

/// Runs the foreground client until the daemon goes away or Ctrl-C.
async fn run_watch(config: &AzaanConfig, client: &IpcClient, play: Option<PrayerName>) -> Result<()> {
    let source = SoundSource::azaan(config.audio_path.as_deref())?;

    match try_create_player(config.volume) {
        Some(player) => watch_loop(ForegroundBridge::new(player, source), config, client, play).await,
        None => {
            tracing::warn!("no audio output device, the azaan cannot be played");
            watch_loop(ForegroundBridge::new(NoAudio, source), config, client, play).await
        }
    }
}

async fn watch_loop<P: SoundPlayer>(
    bridge: ForegroundBridge<P>,
    config: &AzaanConfig,
    client: &IpcClient,
    play: Option<PrayerName>,
) -> Result<()> {
    let mut events = bridge.subscribe();
    let mut banner = Banner::new(config.banner_duration());

    let mut stream = client.watch().await?;
    tracing::info!(client = stream.client_id(), "connected to the daemon");
    Display::show_info("Waiting for prayer times. Press Ctrl-C to stop.");

    if let Some(prayer) = play {
        bridge.play(prayer);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let deadline = banner.deadline();

        tokio::select! {
            line = stream.next_line() => {
                match line? {
                    Some(line) => {
                        bridge.handle_line(&line);
                    }
                    None => {
                        Display::show_info("The daemon closed the connection");
                        break;
                    }
                }
            }
            Ok(event) = events.recv() => {
                let AzaanEvent::Playing { prayer } = event;
                banner.show(event);
                Display::show_banner(prayer);
            }
            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                banner.hide();
                Display::hide_banner();
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
