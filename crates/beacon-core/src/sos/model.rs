//! SOS queue data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a queued SOS request.
///
/// `Pending → Sending → {Sent | Failed}`; `Failed → Sending` is the only
/// re-entry transition. `Sent` items leave the active queue and move to
/// history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SosStatus {
    /// Recorded locally, no delivery attempt made yet.
    #[default]
    Pending,
    /// A delivery attempt is in flight.
    Sending,
    /// Acknowledged by the server.
    Sent,
    /// Last delivery attempt failed; eligible for the next retry sweep.
    Failed,
}

impl SosStatus {
    /// Storage representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Parses a storage representation. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "sending" => Some(Self::Sending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true if the item should be attempted by a retry sweep.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

/// A location fix attached to an SOS request.
///
/// Carried only when the device actually had a fix; a missing location is
/// represented as `None` at the payload level, never as a default position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// User-supplied content of an SOS request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SosPayload {
    /// Optional free-text message.
    pub message: Option<String>,
    /// Optional location fix.
    pub coordinates: Option<Coordinates>,
    /// Opaque identifiers of already-uploaded attachment files.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl SosPayload {
    /// Creates a payload carrying only a message.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    /// Sets the location fix.
    #[must_use]
    pub const fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }
}

/// An emergency request in the active queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedSos {
    /// Locally generated identifier, unique for the life of the install.
    /// All in-process addressing uses this id.
    pub local_id: String,
    /// Server-assigned identifier, populated on acknowledgement.
    pub server_id: Option<String>,
    /// When the request was enqueued.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: SosStatus,
    /// User-supplied content.
    pub payload: SosPayload,
}

impl QueuedSos {
    /// Creates a new pending request with a fresh local id.
    #[must_use]
    pub fn new(payload: SosPayload) -> Self {
        Self {
            local_id: Uuid::new_v4().to_string(),
            server_id: None,
            created_at: Utc::now(),
            status: SosStatus::Pending,
            payload,
        }
    }
}

/// A delivered request, retained in the bounded history view.
#[derive(Debug, Clone, PartialEq)]
pub struct SentSos {
    /// Local identifier the request carried while queued.
    pub local_id: String,
    /// Server-assigned identifier from the acknowledgement.
    pub server_id: String,
    /// When the request was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the server acknowledged delivery.
    pub sent_at: DateTime<Utc>,
    /// Content that was delivered.
    pub payload: SosPayload,
}
