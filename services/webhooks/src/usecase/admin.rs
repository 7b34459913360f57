use anyhow::Context as _;
use chrono::{DateTime, Utc};
use reqwest::Url;
use uuid::Uuid;

use rsvp_domain::pagination::{Page, PageRequest};

use crate::domain::notification::sample_payload;
use crate::domain::policy::WebhookPolicy;
use crate::domain::repository::{DeliveryRepository, DeliveryTransport, EndpointRepository};
use crate::domain::types::{
    AuthHeader, DeliveryResult, DeliveryStatus, DeliveryUpdate, WebhookDelivery,
};
use crate::error::WebhooksServiceError;

// ── GetFailedDeliveries ──────────────────────────────────────────────────────

pub struct GetFailedDeliveriesUseCase<E: EndpointRepository, D: DeliveryRepository> {
    pub endpoints: E,
    pub deliveries: D,
    pub policy: WebhookPolicy,
}

impl<E: EndpointRepository, D: DeliveryRepository> GetFailedDeliveriesUseCase<E, D> {
    /// Terminally failed deliveries of the event's endpoint, newest first.
    pub async fn execute(
        &self,
        event_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<WebhookDelivery>, WebhooksServiceError> {
        let Some(endpoint) = self.endpoints.find_by_event_id(event_id).await? else {
            return Ok(Page::empty());
        };
        self.deliveries
            .list_terminal_failures(endpoint.id, self.policy.max_retries, page.clamped())
            .await
    }
}

// ── RetryFailedDelivery ──────────────────────────────────────────────────────

pub struct RetryFailedDeliveryUseCase<E, D, T>
where
    E: EndpointRepository,
    D: DeliveryRepository,
    T: DeliveryTransport,
{
    pub endpoints: E,
    pub deliveries: D,
    pub transport: T,
    pub policy: WebhookPolicy,
}

impl<E, D, T> RetryFailedDeliveryUseCase<E, D, T>
where
    E: EndpointRepository,
    D: DeliveryRepository,
    T: DeliveryTransport,
{
    pub async fn execute(&self, delivery_id: Uuid) -> Result<bool, WebhooksServiceError> {
        self.execute_at(delivery_id, Utc::now()).await
    }

    /// Resend a failed delivery once, outside the retry budget.
    ///
    /// Returns `true` only when the endpoint answered 200. A failed manual
    /// retry records the response but leaves the schedule and the endpoint's
    /// failure tracking alone. A delivery that a sweep is sending right now
    /// is `pending` and refused.
    pub async fn execute_at(
        &self,
        delivery_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, WebhooksServiceError> {
        let Some(delivery) = self.deliveries.find_by_id(delivery_id).await? else {
            return Ok(false);
        };
        if delivery.status != DeliveryStatus::Failed {
            return Ok(false);
        }
        let endpoint = match self.endpoints.find_by_id(delivery.webhook_id).await? {
            Some(endpoint) if endpoint.is_active => endpoint,
            _ => return Ok(false),
        };
        if !self
            .deliveries
            .claim(&delivery, now + self.policy.retry_delay)
            .await?
        {
            tracing::debug!(%delivery_id, "manual webhook retry lost the claim");
            return Ok(false);
        }

        let result = self
            .transport
            .send(&endpoint.url, &delivery.payload, endpoint.auth_header.as_ref())
            .await;

        if result.success {
            let completed = self
                .deliveries
                .complete_with_endpoint_reset(
                    delivery.id,
                    delivery.retry_count,
                    &DeliveryUpdate::success(&result, delivery.retry_count),
                    endpoint.id,
                )
                .await?;
            if !completed {
                tracing::warn!(%delivery_id, "manual webhook retry outcome dropped, delivery was re-claimed");
            }
            tracing::info!(%delivery_id, webhook_id = %endpoint.id, "manual webhook retry delivered");
            return Ok(true);
        }

        let recorded = self
            .deliveries
            .update(
                delivery.id,
                delivery.retry_count,
                &DeliveryUpdate::failure(&result, delivery.retry_count, delivery.next_retry_at),
            )
            .await?;
        if !recorded {
            tracing::warn!(%delivery_id, "manual webhook retry outcome dropped, delivery was re-claimed");
        }
        tracing::info!(
            %delivery_id,
            status_code = ?result.status_code,
            error = result.error_message.as_deref().unwrap_or_default(),
            "manual webhook retry failed"
        );
        Ok(false)
    }
}

// ── TestWebhookEndpoint ──────────────────────────────────────────────────────

pub struct TestEndpointInput {
    pub url: String,
    pub auth_header_name: Option<String>,
    pub auth_header_value: Option<String>,
}

pub struct TestEndpointUseCase<T: DeliveryTransport> {
    pub transport: T,
}

impl<T: DeliveryTransport> TestEndpointUseCase<T> {
    /// Send the sample payload to an endpoint that has not been saved yet.
    pub async fn execute(
        &self,
        input: TestEndpointInput,
    ) -> Result<DeliveryResult, WebhooksServiceError> {
        let url = validate_webhook_url(&input.url)?;
        let auth_header = AuthHeader::from_parts(input.auth_header_name, input.auth_header_value)?;
        let payload = sample_payload()
            .to_json()
            .context("serialize sample webhook payload")?;

        Ok(self
            .transport
            .send(url.as_str(), &payload, auth_header.as_ref())
            .await)
    }
}

/// Webhook targets must be absolute `https` URLs with a host.
pub fn validate_webhook_url(raw: &str) -> Result<Url, WebhooksServiceError> {
    let url = Url::parse(raw.trim()).map_err(|_| WebhooksServiceError::InvalidWebhookUrl)?;
    if url.scheme() != "https" || url.host_str().is_none_or(str::is_empty) {
        return Err(WebhooksServiceError::InvalidWebhookUrl);
    }
    Ok(url)
}
