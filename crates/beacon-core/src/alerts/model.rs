//! Alert data models.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity, ranked for notification eligibility and display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Immediate danger to life.
    Critical,
    /// Serious threat requiring attention.
    High,
    /// Noteworthy but not urgent.
    Medium,
    /// Informational.
    Low,
}

impl Severity {
    /// Ordinal rank; lower ranks sort first in display.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Whether a newly arrived alert of this severity triggers a local
    /// notification.
    #[must_use]
    pub const fn is_notifiable(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A disaster alert as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Alert category (flood, earthquake, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Short headline.
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Human-readable place name.
    #[serde(default)]
    pub location: String,
    /// Latitude of the affected area, if known.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the affected area, if known.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Severity classification.
    pub severity: Severity,
    /// When the alert was issued.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the alert was last updated.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// The alert list as of the last successful fetch (or the persisted cache
/// from a previous session). Never a partial fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    /// Alerts in server order (recency descending).
    pub alerts: Vec<Alert>,
    /// When the snapshot was last refreshed successfully.
    pub last_updated: Option<DateTime<Utc>>,
}

impl AlertSnapshot {
    /// Creates a snapshot from a fresh fetch.
    #[must_use]
    pub fn new(alerts: Vec<Alert>, last_updated: DateTime<Utc>) -> Self {
        Self {
            alerts,
            last_updated: Some(last_updated),
        }
    }

    /// Alerts ordered for display: severity rank first, then recency
    /// descending within a rank.
    #[must_use]
    pub fn display_order(&self) -> Vec<Alert> {
        let mut alerts = self.alerts.clone();
        alerts.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then(b.created_at.cmp(&a.created_at))
        });
        alerts
    }

    /// Alerts in `incoming` whose ids are absent from this snapshot.
    ///
    /// An empty snapshot yields nothing: the very first load of a session
    /// establishes a baseline instead of notifying for everything at once.
    #[must_use]
    pub fn newly_arrived<'a>(&self, incoming: &'a [Alert]) -> Vec<&'a Alert> {
        if self.alerts.is_empty() {
            return Vec::new();
        }

        let known: HashSet<&str> = self.alerts.iter().map(|a| a.id.as_str()).collect();
        incoming
            .iter()
            .filter(|alert| !known.contains(alert.id.as_str()))
            .collect()
    }
}
