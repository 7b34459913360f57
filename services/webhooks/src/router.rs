use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use rsvp_core::health::{healthz, readiness};
use rsvp_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    deliveries::{get_failed_deliveries, retry_delivery},
    dispatch::{dispatch, process_retries},
    test_endpoint::test_endpoint,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Delivery
        .route("/webhooks/dispatch", post(dispatch))
        .route("/webhooks/retries", post(process_retries))
        .route("/webhooks/test", post(test_endpoint))
        // Admin
        .route(
            "/events/{event_id}/webhook/deliveries/failed",
            get(get_failed_deliveries),
        )
        .route(
            "/webhook-deliveries/{delivery_id}/retry",
            post(retry_delivery),
        )
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
}

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}
