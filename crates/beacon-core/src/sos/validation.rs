//! SOS payload validation.
//!
//! Runs synchronously before enqueue; a payload that fails validation never
//! enters the queue.

use super::model::SosPayload;

/// Maximum accepted message length in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Validation error for an SOS payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SosValidationError {
    /// Message is present but empty after trimming.
    EmptyMessage,
    /// Message exceeds the maximum length.
    MessageTooLong,
    /// Latitude is outside [-90, 90].
    LatitudeOutOfRange,
    /// Longitude is outside [-180, 180].
    LongitudeOutOfRange,
    /// An attachment identifier is empty.
    EmptyAttachmentId,
}

impl SosValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "Message must not be empty",
            Self::MessageTooLong => "Message is too long",
            Self::LatitudeOutOfRange => "Latitude must be between -90 and 90",
            Self::LongitudeOutOfRange => "Longitude must be between -180 and 180",
            Self::EmptyAttachmentId => "Attachment id must not be empty",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyMessage | Self::MessageTooLong => "message",
            Self::LatitudeOutOfRange => "latitude",
            Self::LongitudeOutOfRange => "longitude",
            Self::EmptyAttachmentId => "attachments",
        }
    }
}

impl std::fmt::Display for SosValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SosValidationError {}

/// Result of validating a payload.
pub type ValidationResult = Result<(), Vec<SosValidationError>>;

/// Validate an SOS payload before it is enqueued.
///
/// Returns `Ok(())` if valid, or `Err(Vec<SosValidationError>)` with all
/// errors. An entirely empty payload is valid: an SOS with no message and
/// no location is still a plea for help.
///
/// # Errors
///
/// Returns a vector of `SosValidationError` if any fields are invalid.
pub fn validate_payload(payload: &SosPayload) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(message) = &payload.message {
        if message.trim().is_empty() {
            errors.push(SosValidationError::EmptyMessage);
        } else if message.chars().count() > MAX_MESSAGE_LEN {
            errors.push(SosValidationError::MessageTooLong);
        }
    }

    if let Some(coords) = &payload.coordinates {
        if !(-90.0..=90.0).contains(&coords.latitude) {
            errors.push(SosValidationError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&coords.longitude) {
            errors.push(SosValidationError::LongitudeOutOfRange);
        }
    }

    if payload.attachments.iter().any(|id| id.trim().is_empty()) {
        errors.push(SosValidationError::EmptyAttachmentId);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_valid() {
        assert!(validate_payload(&SosPayload::default()).is_ok());
    }

    #[test]
    fn test_valid_full_payload() {
        let payload = SosPayload::message("trapped near the river").with_coordinates(12.9, 77.6);
        assert!(validate_payload(&payload).is_ok());
    }

    #[test]
    fn test_blank_message_rejected() {
        let payload = SosPayload::message("   ");
        assert_eq!(
            validate_payload(&payload),
            Err(vec![SosValidationError::EmptyMessage])
        );
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let payload = SosPayload::default().with_coordinates(91.0, -200.0);
        let errors = validate_payload(&payload).unwrap_err();
        assert!(errors.contains(&SosValidationError::LatitudeOutOfRange));
        assert!(errors.contains(&SosValidationError::LongitudeOutOfRange));
    }

    #[test]
    fn test_overlong_message_rejected() {
        let payload = SosPayload::message("x".repeat(MAX_MESSAGE_LEN + 1));
        assert_eq!(
            validate_payload(&payload),
            Err(vec![SosValidationError::MessageTooLong])
        );
    }

    #[test]
    fn test_empty_attachment_id_rejected() {
        let payload = SosPayload {
            attachments: vec!["file-1".into(), String::new()],
            ..SosPayload::default()
        };
        assert_eq!(
            validate_payload(&payload),
            Err(vec![SosValidationError::EmptyAttachmentId])
        );
    }
}
