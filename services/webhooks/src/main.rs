use sea_orm::Database;
use tracing::info;

use rsvp_core::config::Config as _;
use rsvp_core::tracing::init_tracing;
use rsvp_webhooks::config::WebhooksConfig;
use rsvp_webhooks::infra::http::HttpDeliveryTransport;
use rsvp_webhooks::router::build_router;
use rsvp_webhooks::state::AppState;
use rsvp_webhooks::worker::run_retry_sweeper;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = WebhooksConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let transport = HttpDeliveryTransport::new(config.delivery_timeout())
        .expect("failed to build webhook HTTP client");

    let state = AppState {
        db,
        transport,
        policy: config.policy(),
    };

    match config.retry_sweep_interval() {
        Some(interval) => {
            tokio::spawn(run_retry_sweeper(state.clone(), interval));
        }
        None => info!("retry sweep loop disabled"),
    }

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.webhooks_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("webhooks service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
