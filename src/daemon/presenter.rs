//! Notification presenter.
//!
//! Receives fire events from the scheduler, checks the permission gate and
//! shows the prayer notification. Each presentation runs in its own task
//! and ends in a terminal `DeliveryState`; responses that need a foreground
//! client are forwarded to the router.
//!
//! Prayer notifications share one replacement id, so a newer prayer takes
//! over the slot of an unanswered older one. Only the presentation that
//! currently owns the slot may route a response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::notification::{
    create_prayer_content, ActionKind, NotificationResponse, NotificationSender, PermissionGate,
    PermissionPlatform,
};
use crate::types::PrayerName;

use super::router::RouteRequest;
use super::scheduler::FireEvent;

// ============================================================================
// DeliveryState
// ============================================================================

/// Lifecycle of one prayer notification.
///
/// `Armed -> Fired -> Actioned(PlayAzaan) | Actioned(Dismiss) | Ignored`.
/// The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Armed,
    Fired,
    Actioned(ActionKind),
    Ignored,
}

impl DeliveryState {
    /// The timer elapsed.
    #[must_use]
    pub fn fire(self) -> Self {
        match self {
            DeliveryState::Armed => DeliveryState::Fired,
            other => other,
        }
    }

    /// The user responded, or the notification went away.
    #[must_use]
    pub fn respond(self, response: NotificationResponse) -> Self {
        match (self, response) {
            (DeliveryState::Fired, NotificationResponse::Action(kind)) => {
                DeliveryState::Actioned(kind)
            }
            (DeliveryState::Fired, _) => DeliveryState::Ignored,
            (other, _) => other,
        }
    }

    /// The notification could not be shown.
    #[must_use]
    pub fn drop_undelivered(self) -> Self {
        match self {
            DeliveryState::Armed | DeliveryState::Fired => DeliveryState::Ignored,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryState::Actioned(_) | DeliveryState::Ignored)
    }
}

// ============================================================================
// NotificationPresenter
// ============================================================================

/// Shows prayer notifications when timers fire.
pub struct NotificationPresenter<S: NotificationSender, P: PermissionPlatform> {
    sender: Arc<S>,
    gate: Arc<PermissionGate<P>>,
    route_tx: mpsc::UnboundedSender<RouteRequest>,
    slot: Arc<AtomicU64>,
}

impl<S, P> NotificationPresenter<S, P>
where
    S: NotificationSender,
    P: PermissionPlatform + 'static,
{
    pub fn new(
        sender: Arc<S>,
        gate: Arc<PermissionGate<P>>,
        route_tx: mpsc::UnboundedSender<RouteRequest>,
    ) -> Self {
        Self {
            sender,
            gate,
            route_tx,
            slot: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Presents every fire event until the channel closes.
    pub async fn run(self, mut fire_rx: mpsc::UnboundedReceiver<FireEvent>) {
        while let Some(event) = fire_rx.recv().await {
            self.present(event.prayer);
        }
        tracing::debug!("presenter stopped");
    }

    /// Presents the notification for `prayer` in a new task.
    pub fn present(&self, prayer: PrayerName) -> JoinHandle<DeliveryState> {
        let sender = Arc::clone(&self.sender);
        let gate = Arc::clone(&self.gate);
        let route_tx = self.route_tx.clone();
        let slot = Arc::clone(&self.slot);

        tokio::spawn(async move { deliver(prayer, &*sender, &*gate, &route_tx, &slot).await })
    }
}

async fn deliver<S, P>(
    prayer: PrayerName,
    sender: &S,
    gate: &PermissionGate<P>,
    route_tx: &mpsc::UnboundedSender<RouteRequest>,
    slot: &AtomicU64,
) -> DeliveryState
where
    S: NotificationSender,
    P: PermissionPlatform,
{
    let state = DeliveryState::Armed.fire();

    if let Err(e) = gate.ensure_granted() {
        tracing::warn!(prayer = %prayer, error = %e, "prayer notification suppressed");
        return state.drop_undelivered();
    }

    let content = create_prayer_content(prayer);
    let generation = slot.fetch_add(1, Ordering::SeqCst) + 1;
    let response = match sender.show(&content).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                prayer = %prayer,
                error = %e,
                suggestion = e.suggestion(),
                "failed to show prayer notification"
            );
            return state.drop_undelivered();
        }
    };

    if slot.load(Ordering::SeqCst) != generation {
        tracing::debug!(
            prayer = %prayer,
            ?response,
            "notification was replaced, ignoring response"
        );
        return state.drop_undelivered();
    }

    tracing::info!(prayer = %prayer, ?response, "prayer notification answered");

    let route = match response {
        NotificationResponse::Action(ActionKind::PlayAzaan) => Some(RouteRequest::Play(prayer)),
        NotificationResponse::Clicked => Some(RouteRequest::Focus),
        NotificationResponse::Action(ActionKind::Dismiss) | NotificationResponse::Closed => None,
    };
    if let Some(route) = route {
        if route_tx.send(route).is_err() {
            tracing::warn!(prayer = %prayer, "router is gone, dropping request");
        }
    }

    state.respond(response)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MockNotificationSender, MockPermissionPlatform, PRAYER_TAG};

    type TestPresenter = NotificationPresenter<MockNotificationSender, MockPermissionPlatform>;

    fn create_presenter(
        platform: MockPermissionPlatform,
    ) -> (
        Arc<MockNotificationSender>,
        TestPresenter,
        mpsc::UnboundedReceiver<RouteRequest>,
    ) {
        let sender = Arc::new(MockNotificationSender::new());
        let gate = Arc::new(PermissionGate::new(platform));
        let (route_tx, route_rx) = mpsc::unbounded_channel();
        let presenter = NotificationPresenter::new(Arc::clone(&sender), gate, route_tx);
        (sender, presenter, route_rx)
    }

    mod delivery_state_tests {
        use super::*;

        #[test]
        fn test_transitions() {
            let fired = DeliveryState::Armed.fire();
            assert_eq!(fired, DeliveryState::Fired);
            assert!(!fired.is_terminal());

            assert_eq!(
                fired.respond(NotificationResponse::Action(ActionKind::PlayAzaan)),
                DeliveryState::Actioned(ActionKind::PlayAzaan)
            );
            assert_eq!(
                fired.respond(NotificationResponse::Action(ActionKind::Dismiss)),
                DeliveryState::Actioned(ActionKind::Dismiss)
            );
            assert_eq!(
                fired.respond(NotificationResponse::Closed),
                DeliveryState::Ignored
            );
        }

        #[test]
        fn test_terminal_states_do_not_change() {
            let done = DeliveryState::Actioned(ActionKind::Dismiss);
            assert!(done.is_terminal());
            assert_eq!(done.fire(), done);
            assert_eq!(
                done.respond(NotificationResponse::Action(ActionKind::PlayAzaan)),
                done
            );
            assert_eq!(DeliveryState::Ignored.drop_undelivered(), DeliveryState::Ignored);
        }
    }

    mod presenter_tests {
        use super::*;

        #[tokio::test]
        async fn test_shows_prayer_notification() {
            let (sender, presenter, _rx) = create_presenter(MockPermissionPlatform::granted());

            let state = presenter.present(PrayerName::Asr).await.unwrap();

            assert_eq!(state, DeliveryState::Ignored);
            let shown = sender.shown();
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].title, "Asr Prayer Time");
            assert_eq!(shown[0].tag, PRAYER_TAG);
            assert!(shown[0].require_interaction);
        }

        #[tokio::test]
        async fn test_permission_not_granted_shows_nothing() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::new());

            let state = presenter.present(PrayerName::Asr).await.unwrap();

            assert_eq!(state, DeliveryState::Ignored);
            assert_eq!(sender.notification_count(), 0);
            assert!(rx.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_unsupported_platform_shows_nothing() {
            let platform = MockPermissionPlatform::granted();
            platform.set_supported(false);
            let (sender, presenter, _rx) = create_presenter(platform);

            presenter.present(PrayerName::Isha).await.unwrap();
            assert_eq!(sender.notification_count(), 0);
        }

        #[tokio::test]
        async fn test_play_action_routes_play() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::granted());
            sender.push_response(NotificationResponse::Action(ActionKind::PlayAzaan));

            let state = presenter.present(PrayerName::Maghrib).await.unwrap();

            assert_eq!(state, DeliveryState::Actioned(ActionKind::PlayAzaan));
            assert_eq!(rx.recv().await, Some(RouteRequest::Play(PrayerName::Maghrib)));
        }

        #[tokio::test]
        async fn test_dismiss_routes_nothing() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::granted());
            sender.push_response(NotificationResponse::Action(ActionKind::Dismiss));

            let state = presenter.present(PrayerName::Fajr).await.unwrap();

            assert_eq!(state, DeliveryState::Actioned(ActionKind::Dismiss));
            assert!(rx.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_click_routes_focus() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::granted());
            sender.push_response(NotificationResponse::Clicked);

            let state = presenter.present(PrayerName::Dhuhr).await.unwrap();

            assert_eq!(state, DeliveryState::Ignored);
            assert_eq!(rx.recv().await, Some(RouteRequest::Focus));
        }

        #[tokio::test]
        async fn test_send_failure_is_terminal() {
            let (sender, presenter, _rx) = create_presenter(MockPermissionPlatform::granted());
            sender.set_should_fail(true);

            let state = presenter.present(PrayerName::Asr).await.unwrap();
            assert_eq!(state, DeliveryState::Ignored);
        }

        async fn wait_for_shown(sender: &MockNotificationSender, count: usize) {
            for _ in 0..50 {
                if sender.notification_count() >= count {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("expected {count} notifications, saw {}", sender.notification_count());
        }

        #[tokio::test]
        async fn test_replaced_notification_routes_nothing() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::granted());
            sender.hold_responses();

            let fajr = presenter.present(PrayerName::Fajr);
            wait_for_shown(&sender, 1).await;
            let dhuhr = presenter.present(PrayerName::Dhuhr);
            wait_for_shown(&sender, 2).await;

            // One press on the visible notification answers both waiters
            assert_eq!(
                sender.release(NotificationResponse::Action(ActionKind::PlayAzaan)),
                2
            );

            assert_eq!(fajr.await.unwrap(), DeliveryState::Ignored);
            assert_eq!(
                dhuhr.await.unwrap(),
                DeliveryState::Actioned(ActionKind::PlayAzaan)
            );
            assert_eq!(rx.recv().await, Some(RouteRequest::Play(PrayerName::Dhuhr)));
            assert!(rx.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_sequential_notifications_each_route() {
            let (sender, presenter, mut rx) = create_presenter(MockPermissionPlatform::granted());
            sender.push_response(NotificationResponse::Action(ActionKind::PlayAzaan));
            sender.push_response(NotificationResponse::Action(ActionKind::PlayAzaan));

            presenter.present(PrayerName::Fajr).await.unwrap();
            presenter.present(PrayerName::Dhuhr).await.unwrap();

            assert_eq!(rx.recv().await, Some(RouteRequest::Play(PrayerName::Fajr)));
            assert_eq!(rx.recv().await, Some(RouteRequest::Play(PrayerName::Dhuhr)));
        }

        #[tokio::test]
        async fn test_run_presents_fire_events() {
            let (sender, presenter, _rx) = create_presenter(MockPermissionPlatform::granted());
            let (fire_tx, fire_rx) = mpsc::unbounded_channel();

            let handle = tokio::spawn(presenter.run(fire_rx));
            fire_tx
                .send(FireEvent {
                    prayer: PrayerName::Isha,
                    fire_at: chrono::Utc::now().fixed_offset(),
                })
                .unwrap();
            drop(fire_tx);
            handle.await.unwrap();

            // Presentation tasks finish shortly after the loop ends
            for _ in 0..10 {
                if sender.notification_count() == 1 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(sender.notification_count(), 1);
        }
    }
}
