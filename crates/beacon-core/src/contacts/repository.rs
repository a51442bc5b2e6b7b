//! Emergency contact storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::EmergencyContact;
use crate::Result;

/// Repository for emergency contact storage and retrieval.
pub struct ContactRepository {
    pool: SqlitePool,
}

impl ContactRepository {
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
            CREATE TABLE IF NOT EXISTS emergency_contacts (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                relation TEXT,
                added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Add a contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn add(&self, contact: &EmergencyContact) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO emergency_contacts (id, name, phone, relation)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&contact.id)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.relation)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List all contacts, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<EmergencyContact>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, phone, relation
            FROM emergency_contacts
            ORDER BY added_at DESC, rowid DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EmergencyContact {
                id: row.get("id"),
                name: row.get("name"),
                phone: row.get("phone"),
                relation: row.get("relation"),
            })
            .collect())
    }

    /// Remove a contact by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn remove(&self, id: &str) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM emergency_contacts WHERE id = ?
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove all contacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM emergency_contacts
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
