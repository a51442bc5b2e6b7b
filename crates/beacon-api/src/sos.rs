//! SOS delivery endpoint.

use serde::{Deserialize, Serialize};

use beacon_core::SosPayload;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};

/// Wire body of `POST /api/sos`.
///
/// Absent fields are omitted entirely: a missing location fix must reach
/// the backend as missing, never as a defaulted position.
#[derive(Debug, Clone, Serialize)]
pub struct SosRequestBody {
    /// Free-text message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Latitude of the sender, when a fix exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude of the sender, when a fix exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Identifiers of already-uploaded attachment files.
    pub attachments: Vec<String>,
}

impl From<&SosPayload> for SosRequestBody {
    fn from(payload: &SosPayload) -> Self {
        Self {
            message: payload.message.clone(),
            latitude: payload.coordinates.map(|c| c.latitude),
            longitude: payload.coordinates.map(|c| c.longitude),
            attachments: payload.attachments.clone(),
        }
    }
}

/// Acknowledgement returned by `POST /api/sos`.
#[derive(Debug, Clone, Deserialize)]
pub struct SosResponse {
    /// Server-assigned identifier; becomes the queue item's `server_id`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Server-side delivery state.
    #[serde(default)]
    pub status: Option<String>,
}

/// Deliver one SOS request to the backend.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on 401, [`ApiError::Status`] on other
/// non-success statuses, and [`ApiError::Network`] on transport failures
/// including the request timeout.
pub async fn create_sos(client: &ApiClient, body: &SosRequestBody) -> ApiResult<SosResponse> {
    let response = client.post("/api/sos").json(body).send().await?;
    let response = ApiClient::check(response).await?;
    response.json().await.map_err(ApiError::Decode)
}
