//! SOS queue storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{Coordinates, QueuedSos, SentSos, SosPayload, SosStatus};
use crate::Result;

/// Maximum number of delivered requests retained in history.
pub const HISTORY_LIMIT: u32 = 100;

/// Repository for durable SOS queue and history storage.
pub struct SosQueueRepository {
    pool: SqlitePool,
}

impl SosQueueRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sos_queue (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                message TEXT,
                latitude REAL,
                longitude REAL,
                attachments TEXT NOT NULL DEFAULT '[]'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_sos_queue_created ON sos_queue(created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sos_history (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                message TEXT,
                latitude REAL,
                longitude REAL,
                attachments TEXT NOT NULL DEFAULT '[]'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_sos_history_sent ON sos_history(sent_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a freshly enqueued request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, item: &QueuedSos) -> Result<()> {
        let attachments = serde_json::to_string(&item.payload.attachments)?;

        sqlx::query(
            r"
            INSERT INTO sos_queue
                (local_id, server_id, created_at, status, message, latitude, longitude, attachments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&item.local_id)
        .bind(&item.server_id)
        .bind(item.created_at.to_rfc3339())
        .bind(item.status.as_str())
        .bind(&item.payload.message)
        .bind(item.payload.coordinates.map(|c| c.latitude))
        .bind(item.payload.coordinates.map(|c| c.longitude))
        .bind(attachments)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the active queue in creation order.
    ///
    /// Rows that fail to decode are skipped rather than failing the load, so
    /// a damaged entry can never take the whole queue down with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self) -> Result<Vec<QueuedSos>> {
        let rows = sqlx::query(
            r"
            SELECT local_id, server_id, created_at, status, message, latitude, longitude, attachments
            FROM sos_queue
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(decode_queue_row).collect())
    }

    /// Demote any `sending` rows back to `pending`.
    ///
    /// A crash mid-delivery leaves no reliable in-flight record; on restart
    /// those rows must become resumable again instead of being stuck
    /// `sending` with no worker claiming them.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn demote_sending(&self) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE sos_queue SET status = 'pending' WHERE status = 'sending'
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Update the status of a queued request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn update_status(&self, local_id: &str, status: SosStatus) -> Result<()> {
        sqlx::query(
            r"
            UPDATE sos_queue SET status = ? WHERE local_id = ?
            ",
        )
        .bind(status.as_str())
        .bind(local_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the attachment list of a queued request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_attachments(&self, local_id: &str, attachments: &[String]) -> Result<()> {
        let json = serde_json::to_string(attachments)?;

        sqlx::query(
            r"
            UPDATE sos_queue SET attachments = ? WHERE local_id = ?
            ",
        )
        .bind(json)
        .bind(local_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a request from the active queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, local_id: &str) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM sos_queue WHERE local_id = ?
            ",
        )
        .bind(local_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a delivered request in history and evict it from the queue.
    ///
    /// History is bounded: entries beyond [`HISTORY_LIMIT`] are pruned,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn record_sent(&self, sent: &SentSos) -> Result<()> {
        let attachments = serde_json::to_string(&sent.payload.attachments)?;

        sqlx::query(
            r"
            INSERT INTO sos_history
                (local_id, server_id, created_at, sent_at, message, latitude, longitude, attachments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(local_id) DO UPDATE SET
                server_id = excluded.server_id,
                sent_at = excluded.sent_at
            ",
        )
        .bind(&sent.local_id)
        .bind(&sent.server_id)
        .bind(sent.created_at.to_rfc3339())
        .bind(sent.sent_at.to_rfc3339())
        .bind(&sent.payload.message)
        .bind(sent.payload.coordinates.map(|c| c.latitude))
        .bind(sent.payload.coordinates.map(|c| c.longitude))
        .bind(attachments)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            DELETE FROM sos_queue WHERE local_id = ?
            ",
        )
        .bind(&sent.local_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            DELETE FROM sos_history
            WHERE local_id NOT IN (
                SELECT local_id FROM sos_history ORDER BY sent_at DESC LIMIT ?
            )
            ",
        )
        .bind(HISTORY_LIMIT)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load delivery history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(&self) -> Result<Vec<SentSos>> {
        let rows = sqlx::query(
            r"
            SELECT local_id, server_id, created_at, sent_at, message, latitude, longitude, attachments
            FROM sos_history
            ORDER BY sent_at DESC
            LIMIT ?
            ",
        )
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(decode_history_row).collect())
    }

    /// Delete all history entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear_history(&self) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM sos_history
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode_payload(row: &SqliteRow) -> SosPayload {
    let latitude: Option<f64> = row.get("latitude");
    let longitude: Option<f64> = row.get("longitude");
    let coordinates = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    let attachments_json: String = row.get("attachments");
    let attachments = serde_json::from_str(&attachments_json).unwrap_or_default();

    SosPayload {
        message: row.get("message"),
        coordinates,
        attachments,
    }
}

fn decode_queue_row(row: &SqliteRow) -> Option<QueuedSos> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .ok()?
        .with_timezone(&Utc);
    let status_str: String = row.get("status");
    let status = SosStatus::parse(&status_str)?;

    Some(QueuedSos {
        local_id: row.get("local_id"),
        server_id: row.get("server_id"),
        created_at,
        status,
        payload: decode_payload(row),
    })
}

fn decode_history_row(row: &SqliteRow) -> Option<SentSos> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .ok()?
        .with_timezone(&Utc);
    let sent_at_str: String = row.get("sent_at");
    let sent_at = DateTime::parse_from_rfc3339(&sent_at_str)
        .ok()?
        .with_timezone(&Utc);

    Some(SentSos {
        local_id: row.get("local_id"),
        server_id: row.get("server_id"),
        created_at,
        sent_at,
        payload: decode_payload(row),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_load() {
        let repo = SosQueueRepository::in_memory().await.unwrap();

        let item = QueuedSos::new(SosPayload::message("help").with_coordinates(12.9, 77.6));
        repo.insert(&item).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], item);
    }

    #[tokio::test]
    async fn test_load_preserves_creation_order() {
        let repo = SosQueueRepository::in_memory().await.unwrap();

        let mut first = QueuedSos::new(SosPayload::message("first"));
        let mut second = QueuedSos::new(SosPayload::message("second"));
        first.created_at = Utc::now() - chrono::Duration::minutes(2);
        second.created_at = Utc::now() - chrono::Duration::minutes(1);

        // Insert out of order; load must come back oldest first.
        repo.insert(&second).await.unwrap();
        repo.insert(&first).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded[0].local_id, first.local_id);
        assert_eq!(loaded[1].local_id, second.local_id);
    }

    #[tokio::test]
    async fn test_demote_sending() {
        let repo = SosQueueRepository::in_memory().await.unwrap();

        let item = QueuedSos::new(SosPayload::message("help"));
        repo.insert(&item).await.unwrap();
        repo.update_status(&item.local_id, SosStatus::Sending)
            .await
            .unwrap();

        let demoted = repo.demote_sending().await.unwrap();
        assert_eq!(demoted, 1);

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded[0].status, SosStatus::Pending);
    }

    #[tokio::test]
    async fn test_record_sent_moves_item_to_history() {
        let repo = SosQueueRepository::in_memory().await.unwrap();

        let item = QueuedSos::new(SosPayload::message("help"));
        repo.insert(&item).await.unwrap();

        let sent = SentSos {
            local_id: item.local_id.clone(),
            server_id: "srv-1".into(),
            created_at: item.created_at,
            sent_at: Utc::now(),
            payload: item.payload.clone(),
        };
        repo.record_sent(&sent).await.unwrap();

        assert!(repo.load().await.unwrap().is_empty());
        let history = repo.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].server_id, "srv-1");
    }

    #[tokio::test]
    async fn test_malformed_row_is_skipped() {
        let repo = SosQueueRepository::in_memory().await.unwrap();

        let good = QueuedSos::new(SosPayload::message("ok"));
        repo.insert(&good).await.unwrap();

        sqlx::query(
            r"
            INSERT INTO sos_queue (local_id, created_at, status)
            VALUES ('bad', 'not-a-timestamp', 'pending')
            ",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].local_id, good.local_id);
    }
}
