//! The daemon run loop.
//!
//! Wires the scheduler, presenter, router and IPC server together, arms
//! today's prayers on start-up and re-arms them after each local midnight.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;

use crate::config::AzaanConfig;
use crate::notification::{
    DesktopNotifier, NotificationSender, PermissionGate, PermissionPlatform, StoredPermission,
};
use crate::prayer::PrayerTimeStore;
use crate::types::PrayerTime;

use super::clock::{fire_instant, Clock, SystemClock};
use super::ipc::{IpcServer, RequestHandler};
use super::presenter::NotificationPresenter;
use super::router::{ClientLauncher, ClientRegistry, ClientRouter, CommandLauncher, RouteRequest};
use super::scheduler::{FireEvent, NotificationScheduler};

/// Delay after midnight before the next day's record is loaded.
const MIDNIGHT_GRACE: Duration = Duration::from_secs(5);

/// Result of a daily refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Timers were re-armed from the day's record.
    Scheduled(usize),
    /// No usable record; existing timers were kept.
    Kept,
}

// ============================================================================
// Daemon
// ============================================================================

/// The assembled background service.
pub struct Daemon<C, S, P, L>
where
    C: Clock,
    S: NotificationSender,
    P: PermissionPlatform + 'static,
    L: ClientLauncher,
{
    store: PrayerTimeStore,
    scheduler: Arc<Mutex<NotificationScheduler<C>>>,
    handler: Arc<RequestHandler<C, S, P>>,
    presenter: NotificationPresenter<S, P>,
    router: ClientRouter<L>,
    fire_rx: mpsc::UnboundedReceiver<FireEvent>,
    route_rx: mpsc::UnboundedReceiver<RouteRequest>,
}

impl<C, S, P, L> Daemon<C, S, P, L>
where
    C: Clock,
    S: NotificationSender,
    P: PermissionPlatform + 'static,
    L: ClientLauncher,
{
    pub fn new(
        store: PrayerTimeStore,
        clock: C,
        sender: Arc<S>,
        gate: Arc<PermissionGate<P>>,
        launcher: L,
    ) -> Self {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let (route_tx, route_rx) = mpsc::unbounded_channel();

        let scheduler = Arc::new(Mutex::new(NotificationScheduler::new(clock, fire_tx)));
        let registry = Arc::new(Mutex::new(ClientRegistry::with_requeue(route_tx.clone())));

        let handler = Arc::new(RequestHandler::new(
            Arc::clone(&scheduler),
            Arc::clone(&registry),
            Arc::clone(&gate),
            Arc::clone(&sender),
        ));
        let presenter = NotificationPresenter::new(sender, gate, route_tx);
        let router = ClientRouter::new(registry, launcher);

        Self {
            store,
            scheduler,
            handler,
            presenter,
            router,
            fire_rx,
            route_rx,
        }
    }

    /// Shared scheduler, for callers that drive it directly.
    pub fn scheduler(&self) -> Arc<Mutex<NotificationScheduler<C>>> {
        Arc::clone(&self.scheduler)
    }

    /// Re-arms the timers from today's record.
    pub async fn refresh(&self) -> Refresh {
        refresh(&self.store, &self.scheduler).await
    }

    /// Serves IPC on `server` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting connections fails.
    pub async fn run(self, server: IpcServer, shutdown: impl Future<Output = ()>) -> Result<()> {
        let Daemon {
            store,
            scheduler,
            handler,
            presenter,
            router,
            fire_rx,
            route_rx,
        } = self;

        let presenter_task = tokio::spawn(presenter.run(fire_rx));
        let router_task = tokio::spawn(router.run(route_rx));

        refresh(&store, &scheduler).await;
        tracing::info!(socket = %server.socket_path().display(), "daemon started");

        tokio::pin!(shutdown);
        let mut midnight = Box::pin(tokio::time::sleep(until_midnight(&scheduler).await));

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutting down");
                    break Ok(());
                }
                _ = &mut midnight => {
                    tracing::info!("new day, reloading prayer times");
                    refresh(&store, &scheduler).await;
                    midnight
                        .as_mut()
                        .reset(tokio::time::Instant::now() + until_midnight(&scheduler).await);
                }
                accepted = server.accept() => {
                    let stream = match accepted {
                        Ok(stream) => stream,
                        Err(e) => break Err(e),
                    };
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve(stream).await {
                            tracing::warn!(error = %e, "IPC connection failed");
                        }
                    });
                }
            }
        };

        scheduler.lock().await.cancel_all();
        presenter_task.abort();
        router_task.abort();
        result
    }
}

/// Loads today's record and arms it. Keeps the current timers when there
/// is none.
async fn refresh<C: Clock>(
    store: &PrayerTimeStore,
    scheduler: &Mutex<NotificationScheduler<C>>,
) -> Refresh {
    let mut scheduler = scheduler.lock().await;
    let today = scheduler.now().date_naive();

    match store.times_for(today) {
        Ok(times) => Refresh::Scheduled(scheduler.schedule(times).len()),
        Err(e) => {
            tracing::warn!(
                date = %today,
                error = %e,
                suggestion = e.suggestion(),
                "no prayer times loaded, keeping existing timers"
            );
            Refresh::Kept
        }
    }
}

/// Time until just after the next local midnight.
async fn until_midnight<C: Clock>(scheduler: &Mutex<NotificationScheduler<C>>) -> Duration {
    let now = scheduler.lock().await.now();
    let midnight = PrayerTime::from_hm(0, 0).map(|t| fire_instant(t, &now));

    midnight
        .and_then(|m| m.signed_duration_since(now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
        + MIDNIGHT_GRACE
}

// ============================================================================
// Entry point
// ============================================================================

/// Runs the daemon with the desktop notifier until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or serving fails.
pub async fn run(config: AzaanConfig) -> Result<()> {
    let socket_path = config.socket_path();
    let server = IpcServer::new(&socket_path)
        .with_context(|| format!("Failed to start daemon on {}", socket_path.display()))?;

    let sender = Arc::new(DesktopNotifier::default());
    if !sender.is_available() {
        tracing::warn!("no notification service found, prayer notifications will not be shown");
    }

    let daemon = Daemon::new(
        PrayerTimeStore::new(config.store_path()),
        SystemClock,
        sender,
        Arc::new(PermissionGate::new(StoredPermission::new(
            config.permission_path(),
        ))),
        CommandLauncher::from_config(&config),
    );

    daemon
        .run(server, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

    use crate::daemon::clock::FixedClock;
    use crate::daemon::router::MockClientLauncher;
    use crate::notification::{MockNotificationSender, MockPermissionPlatform};
    use crate::prayer::PrayerRecord;
    use crate::types::{PrayerName, PrayerTimeSet};

    type TestDaemon = Daemon<
        FixedClock,
        MockNotificationSender,
        MockPermissionPlatform,
        Arc<MockClientLauncher>,
    >;

    fn create_daemon(dir: &tempfile::TempDir, clock: FixedClock) -> (PrayerTimeStore, TestDaemon) {
        let store = PrayerTimeStore::new(dir.path().join("prayer_times.json"));
        let daemon = Daemon::new(
            store.clone(),
            clock,
            Arc::new(MockNotificationSender::new()),
            Arc::new(PermissionGate::new(MockPermissionPlatform::granted())),
            Arc::new(MockClientLauncher::new()),
        );
        (store, daemon)
    }

    fn sample_times() -> PrayerTimeSet {
        PrayerTimeSet::parse("05:30", "12:30", "15:45", "18:15", "19:30").unwrap()
    }

    /// Wall clock that advances with tokio's (pausable) clock.
    struct TickingClock {
        start: DateTime<Utc>,
        origin: tokio::time::Instant,
    }

    impl Clock for TickingClock {
        type Tz = Utc;

        fn now(&self) -> DateTime<Utc> {
            self.start + TimeDelta::from_std(self.origin.elapsed()).unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_schedules_todays_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, daemon) = create_daemon(&dir, FixedClock::at("2025-06-15", "14:00:00").unwrap());
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        store
            .add(PrayerRecord::new(date, sample_times(), "Local Masjid"))
            .unwrap();

        assert_eq!(daemon.refresh().await, Refresh::Scheduled(5));
        assert_eq!(daemon.scheduler().lock().await.live_timers(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_without_record_keeps_timers() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, daemon) = create_daemon(&dir, FixedClock::at("2025-06-15", "14:00:00").unwrap());
        daemon.scheduler().lock().await.schedule(sample_times());

        assert_eq!(daemon.refresh().await, Refresh::Kept);
        assert_eq!(daemon.scheduler().lock().await.live_timers(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, daemon) = create_daemon(&dir, FixedClock::at("2025-06-15", "22:00:00").unwrap());

        let delay = until_midnight(&daemon.scheduler()).await;
        assert_eq!(delay, Duration::from_secs(2 * 60 * 60) + MIDNIGHT_GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown_and_cancels_timers() {
        let dir = tempfile::tempdir().unwrap();
        let (store, daemon) = create_daemon(&dir, FixedClock::at("2025-06-15", "14:00:00").unwrap());
        store
            .add(PrayerRecord::new(
                NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
                sample_times(),
                "Local Masjid",
            ))
            .unwrap();
        let scheduler = daemon.scheduler();
        let server = IpcServer::new(&dir.path().join("azaan.sock")).unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(daemon.run(server, async {
            let _ = stop_rx.await;
        }));

        for _ in 0..10 {
            if scheduler.lock().await.live_timers() == 5 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(scheduler.lock().await.scheduled()[0].prayer, PrayerName::Asr);

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(scheduler.lock().await.live_timers(), 0);
    }
    #[tokio::test(start_paused = true)]
    async fn test_run_rearms_next_day_after_midnight() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrayerTimeStore::new(dir.path().join("prayer_times.json"));
        let next_day_times =
            PrayerTimeSet::parse("05:31", "12:31", "15:44", "18:16", "19:31").unwrap();
        store
            .add(PrayerRecord::new(
                NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
                sample_times(),
                "Local Masjid",
            ))
            .unwrap();
        store
            .add(PrayerRecord::new(
                NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
                next_day_times,
                "Local Masjid",
            ))
            .unwrap();

        let clock = TickingClock {
            start: FixedClock::at("2025-06-15", "23:00:00").unwrap().0,
            origin: tokio::time::Instant::now(),
        };
        let daemon: Daemon<_, MockNotificationSender, MockPermissionPlatform, _> = Daemon::new(
            store,
            clock,
            Arc::new(MockNotificationSender::new()),
            Arc::new(PermissionGate::new(MockPermissionPlatform::granted())),
            Arc::new(MockClientLauncher::new()),
        );
        let scheduler = daemon.scheduler();
        let server = IpcServer::new(&dir.path().join("azaan.sock")).unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(daemon.run(server, async {
            let _ = stop_rx.await;
        }));

        for _ in 0..10 {
            if scheduler.lock().await.times().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(scheduler.lock().await.times(), Some(sample_times()));

        // Past midnight plus the grace period
        tokio::time::sleep(Duration::from_secs(60 * 60) + MIDNIGHT_GRACE + Duration::from_secs(5))
            .await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        {
            let scheduler = scheduler.lock().await;
            assert_eq!(scheduler.times(), Some(next_day_times));
            assert_eq!(scheduler.live_timers(), 5);
            assert_eq!(scheduler.now().date_naive(), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
        }

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
