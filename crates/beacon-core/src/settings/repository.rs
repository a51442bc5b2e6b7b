//! Settings storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::AppSettings;
use crate::Result;

/// Repository for persisted application settings.
///
/// [`SettingsRepository::load_or_init`] is the one initialization entry
/// point: callers never probe for alternative init methods or race to seed
/// defaults themselves.
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
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
            CREATE TABLE IF NOT EXISTS app_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load stored settings, seeding and persisting defaults on first run.
    ///
    /// A stored row that no longer decodes also falls back to defaults
    /// (and rewrites them), so settings can never brick startup.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn load_or_init(&self) -> Result<AppSettings> {
        let row = sqlx::query(
            r"
            SELECT settings_json FROM app_settings WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let settings_json: String = row.get("settings_json");
            if let Ok(settings) = serde_json::from_str::<AppSettings>(&settings_json) {
                return Ok(settings);
            }
        }

        let defaults = AppSettings::default();
        self.save(defaults).await?;
        Ok(defaults)
    }

    /// Persist settings, replacing the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn save(&self, settings: AppSettings) -> Result<()> {
        let settings_json = serde_json::to_string(&settings)?;

        sqlx::query(
            r"
            INSERT INTO app_settings (id, settings_json)
            VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET settings_json = excluded.settings_json
            ",
        )
        .bind(settings_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
