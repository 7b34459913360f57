use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Webhooks service error variants.
#[derive(Debug, thiserror::Error)]
pub enum WebhooksServiceError {
    #[error("webhook url must be a valid https url")]
    InvalidWebhookUrl,
    #[error("auth header name and value must be provided together")]
    IncompleteAuthHeader,
    #[error("event_type does not match the notification type")]
    EventTypeMismatch,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl WebhooksServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidWebhookUrl => "INVALID_WEBHOOK_URL",
            Self::IncompleteAuthHeader => "INCOMPLETE_AUTH_HEADER",
            Self::EventTypeMismatch => "EVENT_TYPE_MISMATCH",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for WebhooksServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidWebhookUrl | Self::IncompleteAuthHeader | Self::EventTypeMismatch => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Only 500s are logged here; TraceLayer already records every request.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
