//! Offline SOS request queue.
//!
//! This module provides the durable queue that accepts emergency requests
//! regardless of network state. Items are recorded locally before any
//! delivery is attempted and survive process restarts; delivery itself is
//! driven by the sync engine.

mod model;
mod queue;
mod repository;
mod validation;

pub use model::{Coordinates, QueuedSos, SentSos, SosPayload, SosStatus};
pub use queue::SosQueue;
pub use repository::{HISTORY_LIMIT, SosQueueRepository};
pub use validation::{SosValidationError, ValidationResult, validate_payload};
