use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::notification::{Notification, WebhookPayload};
use crate::domain::policy::WebhookPolicy;
use crate::domain::repository::{DeliveryRepository, DeliveryTransport, EndpointRepository};
use crate::domain::types::{DeliveryUpdate, WebhookDelivery, WebhookEndpoint};
use crate::error::WebhooksServiceError;
use crate::usecase::failure_tracker::FailureTracker;

/// The event type is the notification's own kind.
pub struct DispatchInput {
    pub event_id: Uuid,
    pub notification: Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoEndpoint,
    Inactive,
    NotSubscribed,
}

/// What a dispatch did. Callers never see an error; a persistence failure
/// shows up as `Aborted`, with the delivery id when a row was already stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Skipped {
        reason: SkipReason,
    },
    Delivered {
        delivery_id: Uuid,
    },
    Failed {
        delivery_id: Uuid,
        #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
        next_retry_at: DateTime<Utc>,
    },
    Aborted {
        delivery_id: Option<Uuid>,
    },
}

/// Sends one notification to the endpoint configured for an event.
pub struct DispatchUseCase<E, D, T>
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

impl<E, D, T> DispatchUseCase<E, D, T>
where
    E: EndpointRepository,
    D: DeliveryRepository,
    T: DeliveryTransport,
{
    pub async fn execute(&self, input: DispatchInput) -> DispatchOutcome {
        self.execute_at(input, Utc::now()).await
    }

    pub async fn execute_at(&self, input: DispatchInput, now: DateTime<Utc>) -> DispatchOutcome {
        let event_id = input.event_id;
        let event_type = input.notification.kind();
        let (endpoint, delivery) = match self.record(input, now).await {
            Ok(Ok(recorded)) => recorded,
            Ok(Err(reason)) => return DispatchOutcome::Skipped { reason },
            Err(e) => {
                tracing::error!(
                    %event_id,
                    %event_type,
                    error = ?e,
                    "webhook dispatch aborted"
                );
                return DispatchOutcome::Aborted { delivery_id: None };
            }
        };

        match self.deliver(&endpoint, &delivery, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    %event_id,
                    %event_type,
                    delivery_id = %delivery.id,
                    retry_at = ?delivery.next_retry_at,
                    error = ?e,
                    "webhook dispatch aborted after send, delivery left pending"
                );
                DispatchOutcome::Aborted {
                    delivery_id: Some(delivery.id),
                }
            }
        }
    }

    /// Resolve the endpoint and store a `pending` delivery leased until the
    /// first retry slot, so the sweep picks it up if no outcome is recorded.
    async fn record(
        &self,
        input: DispatchInput,
        now: DateTime<Utc>,
    ) -> Result<Result<(WebhookEndpoint, WebhookDelivery), SkipReason>, WebhooksServiceError> {
        let DispatchInput {
            event_id,
            notification,
        } = input;
        let event_type = notification.kind();

        let Some(endpoint) = self.endpoints.find_by_event_id(event_id).await? else {
            tracing::debug!(%event_id, "no webhook configured for event");
            return Ok(Err(SkipReason::NoEndpoint));
        };
        if !endpoint.is_active {
            tracing::debug!(%event_id, webhook_id = %endpoint.id, "webhook endpoint is disabled");
            return Ok(Err(SkipReason::Inactive));
        }
        if !endpoint.subscribes_to(event_type) {
            tracing::debug!(%event_id, %event_type, "webhook endpoint not subscribed to event type");
            return Ok(Err(SkipReason::NotSubscribed));
        }

        let payload = WebhookPayload::single(notification)
            .to_json()
            .context("serialize webhook payload")?;
        let mut delivery = WebhookDelivery::pending(endpoint.id, event_type, payload, now);
        delivery.next_retry_at = Some(now + self.policy.retry_delay);
        self.deliveries.create(&delivery).await?;
        Ok(Ok((endpoint, delivery)))
    }

    async fn deliver(
        &self,
        endpoint: &WebhookEndpoint,
        delivery: &WebhookDelivery,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, WebhooksServiceError> {
        let event_type = delivery.event_type;
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
                    &DeliveryUpdate::success(&result, 0),
                    endpoint.id,
                )
                .await?;
            if !completed {
                tracing::warn!(delivery_id = %delivery.id, "webhook delivery was taken over by a retry");
            }
            tracing::info!(
                delivery_id = %delivery.id,
                webhook_id = %endpoint.id,
                %event_type,
                "webhook delivered"
            );
            return Ok(DispatchOutcome::Delivered {
                delivery_id: delivery.id,
            });
        }

        let next_retry_at = now + self.policy.retry_delay;
        let recorded = self
            .deliveries
            .update(
                delivery.id,
                delivery.retry_count,
                &DeliveryUpdate::failure(&result, 0, Some(next_retry_at)),
            )
            .await?;
        if !recorded {
            tracing::warn!(delivery_id = %delivery.id, "webhook delivery was taken over by a retry");
        }
        tracing::warn!(
            delivery_id = %delivery.id,
            webhook_id = %endpoint.id,
            %event_type,
            status_code = ?result.status_code,
            error = result.error_message.as_deref().unwrap_or_default(),
            "webhook delivery failed, retry scheduled"
        );

        FailureTracker {
            endpoints: &self.endpoints,
            policy: &self.policy,
        }
        .on_failure(endpoint.id, now)
        .await?;

        Ok(DispatchOutcome::Failed {
            delivery_id: delivery.id,
            next_retry_at,
        })
    }
}
