use axum::http::StatusCode;

/// Handler for `GET /healthz`: the process is up and serving.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map a dependency probe to a readiness status for `GET /readyz`.
///
/// Services call this from their own readiness handler with the outcome of
/// whatever they depend on (database ping, upstream check).
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
