//! Local notification dispatch.

use tracing::{debug, warn};

/// Fire-and-forget local notification sink.
///
/// The refresh engine emits exactly one notification per newly arrived
/// high-severity alert; no acknowledgement is tracked.
pub trait Notifier: Send + Sync {
    /// Schedules a local notification. `alert_id` travels as opaque
    /// payload data for handlers that open the alert on tap.
    fn notify(&self, title: &str, body: &str, alert_id: &str);
}

/// Desktop notifications via the platform notification service.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, alert_id: &str) {
        debug!("scheduling notification for alert {alert_id}");
        if let Err(e) = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .show()
        {
            // Notification delivery is best-effort; the alert list itself
            // is still updated.
            warn!("failed to show notification: {e}");
        }
    }
}
