use axum::{Json, extract::State};
use serde::Deserialize;

use crate::domain::types::DeliveryResult;
use crate::error::WebhooksServiceError;
use crate::state::AppState;
use crate::usecase::admin::{TestEndpointInput, TestEndpointUseCase};

// ── POST /webhooks/test ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TestEndpointRequest {
    pub url: String,
    pub auth_header_name: Option<String>,
    pub auth_header_value: Option<String>,
}

/// Probe a prospective endpoint with the sample payload. A receiver error is
/// reported in the body, not as an HTTP error.
pub async fn test_endpoint(
    State(state): State<AppState>,
    Json(body): Json<TestEndpointRequest>,
) -> Result<Json<DeliveryResult>, WebhooksServiceError> {
    let usecase = TestEndpointUseCase {
        transport: state.transport.clone(),
    };
    let result = usecase
        .execute(TestEndpointInput {
            url: body.url,
            auth_header_name: body.auth_header_name,
            auth_header_value: body.auth_header_value,
        })
        .await?;
    Ok(Json(result))
}
