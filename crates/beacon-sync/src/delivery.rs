//! SOS delivery engine.
//!
//! Drains the durable queue against the backend. One sweep at a time, one
//! item at a time: emergency requests go out in the order they were made,
//! and a struggling backend never sees a stampede of parallel sends.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use beacon_api::{ApiClient, ApiError, SosRequestBody, create_sos};
use beacon_core::{
    QueuedSos, SentSos, SosPayload, SosQueue, SosValidationError, validate_payload,
};

/// Why a submission was rejected.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The payload failed validation and was never enqueued.
    #[error("invalid SOS payload")]
    Invalid(Vec<SosValidationError>),

    /// The local store refused the write; the request is NOT recorded.
    #[error("failed to record SOS locally: {0}")]
    Storage(#[from] beacon_core::Error),
}

/// Result of one delivery sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Nothing was eligible for delivery.
    Idle,
    /// Every eligible item was attempted.
    Completed {
        /// Items acknowledged by the server.
        sent: usize,
        /// Items that failed and stay queued for the next sweep.
        failed: usize,
    },
    /// The credential was rejected; remaining items were left untouched.
    /// Delivery resumes on a later sweep once the credential is refreshed.
    AbortedUnauthorized {
        /// Items acknowledged before the rejection.
        sent: usize,
        /// Items marked failed, including the one that hit the 401.
        failed: usize,
    },
    /// Another sweep was already running.
    Skipped,
}

/// Owns the SOS queue and drives items through
/// `pending → sending → {sent | failed}`.
pub struct DeliveryEngine {
    queue: Mutex<SosQueue>,
    client: ApiClient,
    sweep_gate: Mutex<()>,
}

impl DeliveryEngine {
    /// Creates an engine over an already-opened queue.
    #[must_use]
    pub fn new(queue: SosQueue, client: ApiClient) -> Self {
        Self {
            queue: Mutex::new(queue),
            client,
            sweep_gate: Mutex::new(()),
        }
    }

    /// Accept a new emergency request.
    ///
    /// The item is validated, then durably recorded before this returns —
    /// network state plays no part. Delivery happens on the next sweep.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Invalid`] for a malformed payload and
    /// [`SubmitError::Storage`] if the local store cannot record the item.
    pub async fn submit(&self, payload: SosPayload) -> Result<QueuedSos, SubmitError> {
        validate_payload(&payload).map_err(SubmitError::Invalid)?;

        let item = self.queue.lock().await.enqueue(payload).await?;
        info!("queued SOS {}", item.local_id);
        Ok(item)
    }

    /// Attempt delivery of every pending or failed item, oldest first.
    ///
    /// Re-entrant calls return [`SweepOutcome::Skipped`] while a sweep is
    /// running, so no item can ever have two attempts in flight.
    pub async fn sweep(&self) -> SweepOutcome {
        let Ok(_guard) = self.sweep_gate.try_lock() else {
            debug!("sweep already in progress");
            return SweepOutcome::Skipped;
        };

        let batch = self.queue.lock().await.retryable();
        if batch.is_empty() {
            return SweepOutcome::Idle;
        }

        info!("sweeping {} queued SOS item(s)", batch.len());
        let mut sent = 0;
        let mut failed = 0;

        for item in batch {
            // The item may have been removed since the snapshot was taken.
            if let Err(e) = self.queue.lock().await.mark_sending(&item.local_id).await {
                debug!("skipping item gone from queue: {e}");
                continue;
            }

            let body = SosRequestBody::from(&item.payload);
            match create_sos(&self.client, &body).await {
                Ok(response) => {
                    match self
                        .queue
                        .lock()
                        .await
                        .mark_sent(&item.local_id, &response.id)
                        .await
                    {
                        Ok(_) => {
                            sent += 1;
                            info!("SOS {} delivered as {}", item.local_id, response.id);
                        }
                        Err(e) => debug!("delivered item gone from queue: {e}"),
                    }
                }
                Err(ApiError::Unauthorized) => {
                    failed += 1;
                    if let Err(e) = self.queue.lock().await.mark_failed(&item.local_id).await {
                        debug!("failed item gone from queue: {e}");
                    }
                    // Remaining items keep their pre-sweep status; delivery
                    // resumes once the credential is refreshed.
                    warn!("credential rejected, aborting sweep");
                    return SweepOutcome::AbortedUnauthorized { sent, failed };
                }
                Err(e) => {
                    failed += 1;
                    if let Err(e) = self.queue.lock().await.mark_failed(&item.local_id).await {
                        debug!("failed item gone from queue: {e}");
                    }
                    warn!("delivery of {} failed: {e}", item.local_id);
                }
            }
        }

        SweepOutcome::Completed { sent, failed }
    }

    /// Snapshot of the active queue for display, newest first.
    pub async fn pending(&self) -> Vec<QueuedSos> {
        self.queue.lock().await.pending()
    }

    /// Delivery history, most recent first.
    pub async fn history(&self) -> Vec<SentSos> {
        self.queue.lock().await.history().await
    }

    /// Toggle an attachment on the queued item addressed by `local_id`.
    ///
    /// Returns whether the attachment is present after the toggle.
    ///
    /// # Errors
    ///
    /// Returns an error if no queued item carries `local_id`.
    pub async fn toggle_attachment(
        &self,
        local_id: &str,
        file_id: &str,
    ) -> beacon_core::Result<bool> {
        self.queue
            .lock()
            .await
            .toggle_attachment(local_id, file_id)
            .await
    }

    /// Whether `file_id` is attached to the queued item `local_id`.
    pub async fn is_attached(&self, local_id: &str, file_id: &str) -> bool {
        self.queue.lock().await.is_attached(local_id, file_id)
    }

    /// Withdraw a queued item without delivering it.
    ///
    /// # Errors
    ///
    /// Returns an error if no queued item carries `local_id`.
    pub async fn withdraw(&self, local_id: &str) -> beacon_core::Result<()> {
        self.queue.lock().await.remove(local_id).await
    }

    /// Delete all delivery history.
    pub async fn clear_history(&self) {
        self.queue.lock().await.clear_history().await;
    }
}

impl std::fmt::Debug for DeliveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryEngine").finish_non_exhaustive()
    }
}
