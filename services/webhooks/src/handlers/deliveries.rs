use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use uuid::Uuid;

use rsvp_domain::pagination::{Page, PageRequest};

use crate::domain::types::{DeliveryStatus, NotificationKind, WebhookDelivery};
use crate::error::WebhooksServiceError;
use crate::state::AppState;
use crate::usecase::admin::{GetFailedDeliveriesUseCase, RetryFailedDeliveryUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: NotificationKind,
    pub status: DeliveryStatus,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms_opt")]
    pub next_retry_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<WebhookDelivery> for DeliveryResponse {
    fn from(delivery: WebhookDelivery) -> Self {
        Self {
            id: delivery.id,
            webhook_id: delivery.webhook_id,
            event_type: delivery.event_type,
            status: delivery.status,
            status_code: delivery.status_code,
            response_body: delivery.response_body,
            error_message: delivery.error_message,
            retry_count: delivery.retry_count,
            next_retry_at: delivery.next_retry_at,
            created_at: delivery.created_at,
            updated_at: delivery.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct RetryDeliveryResponse {
    pub success: bool,
}

// ── GET /events/{event_id}/webhook/deliveries/failed ─────────────────────────

pub async fn get_failed_deliveries(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<DeliveryResponse>>, WebhooksServiceError> {
    let usecase = GetFailedDeliveriesUseCase {
        endpoints: state.endpoint_repo(),
        deliveries: state.delivery_repo(),
        policy: state.policy,
    };
    let page = usecase.execute(event_id, page).await?;
    Ok(Json(page.map(DeliveryResponse::from)))
}

// ── POST /webhook-deliveries/{delivery_id}/retry ─────────────────────────────

pub async fn retry_delivery(
    State(state): State<AppState>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<RetryDeliveryResponse>, WebhooksServiceError> {
    let usecase = RetryFailedDeliveryUseCase {
        endpoints: state.endpoint_repo(),
        deliveries: state.delivery_repo(),
        transport: state.transport.clone(),
        policy: state.policy,
    };
    let success = usecase.execute(delivery_id).await?;
    Ok(Json(RetryDeliveryResponse { success }))
}
