use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::domain::types::NotificationKind;
use crate::error::WebhooksServiceError;
use crate::state::AppState;
use crate::usecase::dispatch::{DispatchInput, DispatchOutcome};
use crate::usecase::retry::RetrySweepReport;

// ── POST /webhooks/dispatch ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DispatchRequest {
    pub event_id: Uuid,
    pub event_type: NotificationKind,
    pub notification: Notification,
}

impl DispatchRequest {
    fn into_input(self) -> Result<DispatchInput, WebhooksServiceError> {
        if self.event_type != self.notification.kind() {
            return Err(WebhooksServiceError::EventTypeMismatch);
        }
        Ok(DispatchInput {
            event_id: self.event_id,
            notification: self.notification,
        })
    }
}

/// `202 Accepted` for every well-formed request: delivery problems are
/// recorded, never returned.
pub async fn dispatch(
    State(state): State<AppState>,
    Json(body): Json<DispatchRequest>,
) -> Result<(StatusCode, Json<DispatchOutcome>), WebhooksServiceError> {
    let input = body.into_input()?;
    let outcome = state.dispatcher().execute(input).await;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

// ── POST /webhooks/retries ───────────────────────────────────────────────────

pub async fn process_retries(
    State(state): State<AppState>,
) -> Result<Json<RetrySweepReport>, WebhooksServiceError> {
    let report = state.retry_sweeper().execute().await?;
    Ok(Json(report))
}
