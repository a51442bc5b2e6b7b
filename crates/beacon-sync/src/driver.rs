//! Trigger wiring for the sync engines.
//!
//! Mirrors the app lifecycle: a sweep and a silent alert refresh run when
//! connectivity returns or the app comes back to the foreground, and a
//! periodic sweep runs while online. Nothing runs while offline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::delivery::DeliveryEngine;
use crate::network::NetworkState;
use crate::refresh::AlertRefreshEngine;

/// Periodic sweep cadence while online.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(20);

/// Host lifecycle signals the driver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleEvent {
    Foregrounded,
}

/// Runs the trigger loop for both engines.
#[derive(Debug)]
pub struct SyncDriver {
    delivery: Arc<DeliveryEngine>,
    alerts: Arc<AlertRefreshEngine>,
    network: watch::Receiver<NetworkState>,
}

/// Handle to a spawned driver.
///
/// Dropping the handle aborts the loop; keeping it alive lets the host
/// report lifecycle events.
#[derive(Debug)]
pub struct SyncHandle {
    lifecycle: mpsc::Sender<LifecycleEvent>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Report that the app returned to the foreground. Kicks a sweep and a
    /// silent alert refresh.
    pub async fn foregrounded(&self) {
        if self.lifecycle.send(LifecycleEvent::Foregrounded).await.is_err() {
            debug!("sync driver is gone, foreground event dropped");
        }
    }

    /// Stops the trigger loop.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SyncDriver {
    /// Creates a driver over the two engines and a reachability feed.
    #[must_use]
    pub fn new(
        delivery: Arc<DeliveryEngine>,
        alerts: Arc<AlertRefreshEngine>,
        network: watch::Receiver<NetworkState>,
    ) -> Self {
        Self {
            delivery,
            alerts,
            network,
        }
    }

    /// Spawns the trigger loop on the current runtime.
    #[must_use]
    pub fn spawn(self) -> SyncHandle {
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(8);
        let task = tokio::spawn(self.run(lifecycle_rx));
        SyncHandle {
            lifecycle: lifecycle_tx,
            task,
        }
    }

    async fn run(mut self, mut lifecycle: mpsc::Receiver<LifecycleEvent>) {
        // Catch up on anything queued while the process was down.
        if self.network.borrow().is_online() {
            self.delivery.sweep().await;
        }

        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of an interval fires immediately; consume it so the
        // periodic sweep starts one full interval from now.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = self.network.changed() => {
                    if changed.is_err() {
                        info!("network monitor gone, stopping sync driver");
                        break;
                    }
                    let online = self.network.borrow_and_update().is_online();
                    if online {
                        info!("connectivity regained, syncing");
                        self.delivery.sweep().await;
                        self.alerts.refresh(true).await;
                    }
                }
                event = lifecycle.recv() => {
                    let Some(event) = event else {
                        info!("lifecycle feed gone, stopping sync driver");
                        break;
                    };
                    match event {
                        LifecycleEvent::Foregrounded => {
                            debug!("app foregrounded, syncing");
                            self.delivery.sweep().await;
                            self.alerts.refresh(true).await;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if self.network.borrow().is_online() {
                        self.delivery.sweep().await;
                    }
                }
            }
        }
    }
}
