use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Initialize structured JSON tracing to stdout. Call once at service startup.
///
/// Honors `RUST_LOG`; falls back to `info`. Repeated calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .try_init();
}
