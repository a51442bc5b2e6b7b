//! Alert list endpoint.

use beacon_core::Alert;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};

/// Fetch the current alert list.
///
/// The backend returns alerts sorted by recency descending, capped
/// server-side; display re-ordering (severity first) happens in the
/// snapshot layer.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on 401, [`ApiError::Status`] on other
/// non-success statuses, and [`ApiError::Network`] on transport failures
/// including the request timeout.
pub async fn fetch_alerts(client: &ApiClient) -> ApiResult<Vec<Alert>> {
    let response = client.get("/api/alerts").send().await?;
    let response = ApiClient::check(response).await?;
    response.json().await.map_err(ApiError::Decode)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::StaticToken;
    use beacon_core::Severity;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_alerts_decodes_wire_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "_id": "a1",
                    "type": "flood",
                    "title": "River rising",
                    "description": "Evacuate low areas",
                    "location": "Riverside",
                    "latitude": 12.9,
                    "longitude": 77.6,
                    "severity": "critical",
                    "createdAt": "2026-08-01T10:00:00Z",
                    "updatedAt": "2026-08-01T10:05:00Z",
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ApiClient::new(server.uri(), Arc::new(StaticToken::anonymous())).unwrap();
        let alerts = fetch_alerts(&client).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "a1");
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client =
            ApiClient::new(server.uri(), Arc::new(StaticToken::anonymous())).unwrap();
        let err = fetch_alerts(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
