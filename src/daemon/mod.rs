//! Daemon module for the azaan service.
//!
//! This module contains the background service:
//! - `clock`: Wall-clock source and fire-instant computation
//! - `scheduler`: One delay timer per prayer
//! - `presenter`: Shows the notification when a timer fires
//! - `router`: Sends play/focus requests to foreground clients
//! - `ipc`: Unix socket server and request handling
//! - `server`: The run loop tying these together

pub mod clock;
pub mod ipc;
pub mod presenter;
pub mod router;
pub mod scheduler;
pub mod server;

pub use clock::{fire_instant, Clock, FixedClock, SystemClock};
pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use presenter::{DeliveryState, NotificationPresenter};
pub use router::{
    ClientLauncher, ClientRegistry, ClientRouter, CommandLauncher, MockClientLauncher,
    RouteOutcome, RouteRequest,
};
pub use scheduler::{FireEvent, NotificationScheduler, ScheduledNotification};
pub use server::{run, Daemon, Refresh};
