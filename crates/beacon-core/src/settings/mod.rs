//! Persisted application settings.

mod model;
mod repository;

pub use model::AppSettings;
pub use repository::SettingsRepository;
