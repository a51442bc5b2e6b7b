//! Runtime configuration from the environment.

use std::path::PathBuf;

use anyhow::Context;

/// Default backend when `BEACON_API_URL` is unset.
const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL.
    pub api_url: String,
    /// Path of the local `SQLite` database.
    pub database_path: PathBuf,
    /// Bearer token from the environment, if provided. Falls back to the
    /// system keyring when absent.
    pub token: Option<String>,
}

impl Config {
    /// Resolves configuration from environment variables and the platform
    /// data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable data directory exists or it cannot be
    /// created.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url =
            std::env::var("BEACON_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = std::env::var("BEACON_TOKEN").ok().filter(|t| !t.is_empty());

        let data_dir = match std::env::var_os("BEACON_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .context("no platform data directory available; set BEACON_DATA_DIR")?
                .join("beacon"),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        Ok(Self {
            api_url,
            database_path: data_dir.join("beacon.db"),
            token,
        })
    }

    /// Database path as the string form `sqlx` expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not valid UTF-8.
    pub fn database_path_str(&self) -> anyhow::Result<&str> {
        self.database_path
            .to_str()
            .context("database path is not valid UTF-8")
    }
}
