//! Alert snapshot cache repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{Alert, AlertSnapshot};
use crate::Result;

/// Repository for the persisted alert snapshot.
///
/// Stores a single row: the alert list of the last successful fetch plus
/// its timestamp. Saving replaces the previous snapshot atomically, so a
/// reader never observes a torn fetch.
pub struct AlertCacheRepository {
    pool: SqlitePool,
}

impl AlertCacheRepository {
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
            CREATE TABLE IF NOT EXISTS alert_cache (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                alerts_json TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn save(&self, alerts: &[Alert], last_updated: DateTime<Utc>) -> Result<()> {
        let alerts_json = serde_json::to_string(alerts)?;

        sqlx::query(
            r"
            INSERT INTO alert_cache (id, alerts_json, last_updated)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                alerts_json = excluded.alerts_json,
                last_updated = excluded.last_updated
            ",
        )
        .bind(alerts_json)
        .bind(last_updated.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the cached snapshot, if one exists and decodes cleanly.
    ///
    /// A corrupt cache row yields `None` rather than an error; the cache is
    /// an optimization, not a source of truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self) -> Result<Option<AlertSnapshot>> {
        let row = sqlx::query(
            r"
            SELECT alerts_json, last_updated FROM alert_cache WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let alerts_json: String = row.get("alerts_json");
        let last_updated_str: String = row.get("last_updated");

        let Ok(alerts) = serde_json::from_str::<Vec<Alert>>(&alerts_json) else {
            return Ok(None);
        };
        let Ok(last_updated) = DateTime::parse_from_rfc3339(&last_updated_str) else {
            return Ok(None);
        };

        Ok(Some(AlertSnapshot::new(
            alerts,
            last_updated.with_timezone(&Utc),
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::alerts::Severity;

    fn alert(id: &str) -> Alert {
        let at = Utc::now();
        Alert {
            id: id.to_string(),
            kind: "flood".to_string(),
            title: "River rising".to_string(),
            description: String::new(),
            location: "Riverside".to_string(),
            latitude: Some(12.9),
            longitude: Some(77.6),
            severity: Severity::High,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let repo = AlertCacheRepository::in_memory().await.unwrap();

        let alerts = vec![alert("a"), alert("b")];
        let at = Utc::now();
        repo.save(&alerts, at).await.unwrap();

        let snapshot = repo.load().await.unwrap().unwrap();
        assert_eq!(snapshot.alerts.len(), 2);
        assert_eq!(snapshot.alerts[0].id, "a");
        assert!(snapshot.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_empty_cache_loads_none() {
        let repo = AlertCacheRepository::in_memory().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let repo = AlertCacheRepository::in_memory().await.unwrap();

        repo.save(&[alert("a")], Utc::now()).await.unwrap();
        repo.save(&[alert("b")], Utc::now()).await.unwrap();

        let snapshot = repo.load().await.unwrap().unwrap();
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].id, "b");
    }

    #[tokio::test]
    async fn test_corrupt_cache_loads_none() {
        let repo = AlertCacheRepository::in_memory().await.unwrap();

        sqlx::query(
            r"
            INSERT INTO alert_cache (id, alerts_json, last_updated)
            VALUES (1, 'not json', '2026-08-01T10:00:00Z')
            ",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        assert!(repo.load().await.unwrap().is_none());
    }
}
