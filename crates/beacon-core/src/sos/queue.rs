//! In-memory queue state over the durable repository.
//!
//! The in-memory copy is authoritative for the current session. Enqueue is
//! recorded durably before it returns; later state transitions persist
//! best-effort, so a storage hiccup degrades durability without losing the
//! live queue.

use chrono::Utc;
use tracing::warn;

use super::model::{QueuedSos, SentSos, SosPayload, SosStatus};
use super::repository::SosQueueRepository;
use crate::{Error, Result};

/// The active SOS queue.
///
/// Owned by the delivery engine; all mutation goes through it. Other layers
/// only read snapshots via [`SosQueue::pending`] and [`SosQueue::history`].
pub struct SosQueue {
    items: Vec<QueuedSos>,
    repository: SosQueueRepository,
}

impl SosQueue {
    /// Rehydrates the queue from durable storage.
    ///
    /// Any item persisted as `sending` is demoted to `pending` first: a
    /// crash mid-delivery leaves no worker claiming it. A failed load yields
    /// an empty queue rather than an error, so a damaged store can never
    /// block new emergency requests.
    pub async fn open(repository: SosQueueRepository) -> Self {
        if let Err(e) = repository.demote_sending().await {
            warn!("failed to demote in-flight items: {e}");
        }

        let items = match repository.load().await {
            Ok(items) => items,
            Err(e) => {
                warn!("failed to load SOS queue, starting empty: {e}");
                Vec::new()
            }
        };

        Self { items, repository }
    }

    /// Enqueue a new emergency request.
    ///
    /// The item is durably recorded before this returns, independent of
    /// network state. The caller is expected to have validated the payload.
    ///
    /// # Errors
    ///
    /// Returns an error only on a local-storage fault; the item is not kept
    /// in memory in that case, so the caller can surface the failure.
    pub async fn enqueue(&mut self, payload: SosPayload) -> Result<QueuedSos> {
        let item = QueuedSos::new(payload);
        self.repository.insert(&item).await?;
        self.items.push(item.clone());
        Ok(item)
    }

    /// Mark an item as having a delivery attempt in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item carries `local_id`.
    pub async fn mark_sending(&mut self, local_id: &str) -> Result<()> {
        self.set_status(local_id, SosStatus::Sending)?;
        if let Err(e) = self.repository.update_status(local_id, SosStatus::Sending).await {
            warn!("failed to persist sending state for {local_id}: {e}");
        }
        Ok(())
    }

    /// Mark an item as failed; it stays queued for the next retry sweep.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item carries `local_id`.
    pub async fn mark_failed(&mut self, local_id: &str) -> Result<()> {
        self.set_status(local_id, SosStatus::Failed)?;
        if let Err(e) = self.repository.update_status(local_id, SosStatus::Failed).await {
            warn!("failed to persist failed state for {local_id}: {e}");
        }
        Ok(())
    }

    /// Reconcile a server acknowledgement: bind the server id, evict the
    /// item from the active queue and append it to bounded history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item carries `local_id`.
    pub async fn mark_sent(&mut self, local_id: &str, server_id: &str) -> Result<SentSos> {
        let position = self.position(local_id)?;
        let item = self.items.remove(position);

        let sent = SentSos {
            local_id: item.local_id,
            server_id: server_id.to_string(),
            created_at: item.created_at,
            sent_at: Utc::now(),
            payload: item.payload,
        };

        if let Err(e) = self.repository.record_sent(&sent).await {
            warn!("failed to persist delivery of {local_id}: {e}");
        }

        Ok(sent)
    }

    /// Items eligible for a retry sweep (`pending` or `failed`), in creation
    /// order so requests are dispatched as they were made.
    #[must_use]
    pub fn retryable(&self) -> Vec<QueuedSos> {
        let mut items: Vec<QueuedSos> = self
            .items
            .iter()
            .filter(|item| item.status.is_retryable())
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        items
    }

    /// Snapshot of the active queue for display, newest first.
    #[must_use]
    pub fn pending(&self) -> Vec<QueuedSos> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| std::cmp::Reverse(item.created_at));
        items
    }

    /// Delivery history, most recent first. A failed read yields an empty
    /// view; history is an audit aid, never a gate.
    pub async fn history(&self) -> Vec<SentSos> {
        match self.repository.history().await {
            Ok(history) => history,
            Err(e) => {
                warn!("failed to load SOS history: {e}");
                Vec::new()
            }
        }
    }

    /// Toggle an attachment on the item addressed by `local_id`.
    ///
    /// Returns whether the attachment is present after the toggle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item carries `local_id`.
    pub async fn toggle_attachment(&mut self, local_id: &str, file_id: &str) -> Result<bool> {
        let position = self.position(local_id)?;
        let attachments = &mut self.items[position].payload.attachments;

        let attached = if let Some(index) = attachments.iter().position(|id| id == file_id) {
            attachments.remove(index);
            false
        } else {
            attachments.push(file_id.to_string());
            true
        };

        let snapshot = attachments.clone();
        if let Err(e) = self.repository.set_attachments(local_id, &snapshot).await {
            warn!("failed to persist attachments for {local_id}: {e}");
        }

        Ok(attached)
    }

    /// Whether `file_id` is attached to the item addressed by `local_id`.
    #[must_use]
    pub fn is_attached(&self, local_id: &str, file_id: &str) -> bool {
        self.items
            .iter()
            .find(|item| item.local_id == local_id)
            .is_some_and(|item| item.payload.attachments.iter().any(|id| id == file_id))
    }

    /// Remove an item from the active queue without delivering it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] if no item carries `local_id`.
    pub async fn remove(&mut self, local_id: &str) -> Result<()> {
        let position = self.position(local_id)?;
        self.items.remove(position);
        if let Err(e) = self.repository.delete(local_id).await {
            warn!("failed to persist removal of {local_id}: {e}");
        }
        Ok(())
    }

    /// Delete all delivery history.
    pub async fn clear_history(&self) {
        if let Err(e) = self.repository.clear_history().await {
            warn!("failed to clear SOS history: {e}");
        }
    }

    /// Number of items in the active queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the active queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, local_id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.local_id == local_id)
            .ok_or_else(|| Error::ItemNotFound(local_id.to_string()))
    }

    fn set_status(&mut self, local_id: &str, status: SosStatus) -> Result<()> {
        let position = self.position(local_id)?;
        self.items[position].status = status;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn open_queue() -> SosQueue {
        SosQueue::open(SosQueueRepository::in_memory().await.unwrap()).await
    }

    #[tokio::test]
    async fn test_enqueue_is_durable_before_return() {
        let repository = SosQueueRepository::in_memory().await.unwrap();
        let mut queue = SosQueue::open(repository).await;

        let item = queue.enqueue(SosPayload::message("help")).await.unwrap();
        assert_eq!(item.status, SosStatus::Pending);

        // The repository already holds the row.
        let persisted = queue.repository.load().await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].local_id, item.local_id);
    }

    #[tokio::test]
    async fn test_mark_sent_evicts_and_records_history() {
        let mut queue = open_queue().await;
        let item = queue.enqueue(SosPayload::message("help")).await.unwrap();

        queue.mark_sending(&item.local_id).await.unwrap();
        let sent = queue.mark_sent(&item.local_id, "srv-9").await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(sent.server_id, "srv-9");

        let history = queue.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].local_id, item.local_id);
    }

    #[tokio::test]
    async fn test_retryable_is_creation_ordered_and_skips_terminal() {
        let mut queue = open_queue().await;
        let a = queue.enqueue(SosPayload::message("a")).await.unwrap();
        let b = queue.enqueue(SosPayload::message("b")).await.unwrap();
        let c = queue.enqueue(SosPayload::message("c")).await.unwrap();

        queue.mark_failed(&a.local_id).await.unwrap();
        queue.mark_sending(&b.local_id).await.unwrap();

        let retryable = queue.retryable();
        assert_eq!(retryable.len(), 2);
        assert_eq!(retryable[0].local_id, a.local_id);
        assert_eq!(retryable[1].local_id, c.local_id);
    }

    #[tokio::test]
    async fn test_toggle_attachment_targets_explicit_item() {
        let mut queue = open_queue().await;
        let first = queue.enqueue(SosPayload::message("first")).await.unwrap();
        let second = queue.enqueue(SosPayload::message("second")).await.unwrap();

        assert!(queue.toggle_attachment(&first.local_id, "file-1").await.unwrap());
        assert!(queue.is_attached(&first.local_id, "file-1"));
        assert!(!queue.is_attached(&second.local_id, "file-1"));

        assert!(!queue.toggle_attachment(&first.local_id, "file-1").await.unwrap());
        assert!(!queue.is_attached(&first.local_id, "file-1"));

        assert!(matches!(
            queue.toggle_attachment("nope", "file-1").await,
            Err(Error::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item_is_reported() {
        let mut queue = open_queue().await;
        assert!(matches!(
            queue.mark_failed("missing").await,
            Err(Error::ItemNotFound(_))
        ));
    }
}
