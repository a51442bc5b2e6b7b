//! Network reachability observer.
//!
//! The host environment feeds connectivity changes into
//! [`NetworkMonitor::set_online`]; the engines subscribe and treat every
//! offline→online transition as a cue to sweep the queue.

use tokio::sync::watch;
use tracing::info;

/// Current reachability as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    /// The backend is believed reachable.
    #[default]
    Online,
    /// No connectivity; delivery attempts are pointless.
    Offline,
}

impl NetworkState {
    /// Whether delivery attempts should be made in this state.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Publishes reachability transitions to any number of subscribers.
#[derive(Debug)]
pub struct NetworkMonitor {
    sender: watch::Sender<NetworkState>,
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(initial: NetworkState) -> Self {
        Self {
            sender: watch::Sender::new(initial),
        }
    }

    /// Creates a monitor that assumes connectivity until told otherwise.
    #[must_use]
    pub fn assume_online() -> Self {
        Self::new(NetworkState::Online)
    }

    /// Records a reachability change. Repeated reports of the same state
    /// are absorbed without notifying subscribers.
    pub fn set_online(&self, online: bool) {
        let next = if online {
            NetworkState::Online
        } else {
            NetworkState::Offline
        };

        self.sender.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                info!("network transition: {state:?} -> {next:?}");
                *state = next;
                true
            }
        });
    }

    /// Subscribes to reachability changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.sender.subscribe()
    }

    /// Current reachability.
    #[must_use]
    pub fn current(&self) -> NetworkState {
        *self.sender.borrow()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::assume_online()
    }
}
