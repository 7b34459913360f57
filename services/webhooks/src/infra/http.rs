use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::domain::repository::DeliveryTransport;
use crate::domain::types::{AuthHeader, DeliveryResult};

pub const USER_AGENT: &str = concat!("rsvp-webhooks/", env!("CARGO_PKG_VERSION"));

/// Response bodies longer than this many characters are cut and suffixed with `...`.
const MAX_RESPONSE_BODY_CHARS: usize = 1000;

/// reqwest-backed [`DeliveryTransport`]. Cheap to clone; the connection pool is shared.
#[derive(Clone)]
pub struct HttpDeliveryTransport {
    client: reqwest::Client,
}

impl HttpDeliveryTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl DeliveryTransport for HttpDeliveryTransport {
    async fn send(
        &self,
        url: &str,
        body: &str,
        auth_header: Option<&AuthHeader>,
    ) -> DeliveryResult {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned());
        if let Some(header) = auth_header {
            request = request.header(header.name.as_str(), header.value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return failed_request(&e),
        };
        let status = response.status();
        let response_body = match response.text().await {
            Ok(text) => Some(truncate_body(text)),
            Err(e) if e.is_timeout() => return DeliveryResult::timed_out(),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read webhook response body");
                None
            }
        };

        if status == reqwest::StatusCode::OK {
            DeliveryResult::delivered(status.as_u16(), response_body)
        } else {
            DeliveryResult::rejected(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status"),
                response_body,
            )
        }
    }
}

fn failed_request(e: &reqwest::Error) -> DeliveryResult {
    if e.is_timeout() {
        DeliveryResult::timed_out()
    } else {
        DeliveryResult::errored(e.to_string())
    }
}

fn truncate_body(text: String) -> String {
    match text.char_indices().nth(MAX_RESPONSE_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
