//! # beacon-sync
//!
//! The engines that keep the Beacon client consistent with the backend:
//!
//! - [`DeliveryEngine`] - drains the durable SOS queue against the backend,
//!   one item at a time, retrying across connectivity loss until every
//!   request is acknowledged
//! - [`AlertRefreshEngine`] - fetches the alert list, diffs it against the
//!   previous snapshot to notify on newly arrived high-severity alerts, and
//!   backs off exponentially on failure
//! - [`NetworkMonitor`] - reachability observer feeding both engines
//! - [`SyncDriver`] - trigger wiring: foreground resume, connectivity
//!   regained, and a periodic timer while online

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod delivery;
mod driver;
mod network;
mod notify;
mod refresh;
mod schedule;

pub use delivery::{DeliveryEngine, SubmitError, SweepOutcome};
pub use driver::{SWEEP_INTERVAL, SyncDriver, SyncHandle};
pub use network::{NetworkMonitor, NetworkState};
pub use notify::{DesktopNotifier, Notifier};
pub use refresh::{AlertRefreshEngine, AlertStatus, REFRESH_ERROR_MESSAGE, RefreshConfig};
pub use schedule::{ScheduledTask, schedule};
