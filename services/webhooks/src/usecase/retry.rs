use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::policy::WebhookPolicy;
use crate::domain::repository::{DeliveryRepository, DeliveryTransport, EndpointRepository};
use crate::domain::types::{DeliveryUpdate, WebhookDelivery};
use crate::error::WebhooksServiceError;
use crate::usecase::failure_tracker::FailureTracker;

/// Tally of one retry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrySweepReport {
    /// Deliveries selected as due.
    pub due: usize,
    /// Left alone: the endpoint is gone or disabled, or another worker
    /// claimed the delivery first.
    pub skipped: usize,
    pub succeeded: usize,
    /// Failed again with budget left.
    pub rescheduled: usize,
    /// Failed again and ran out of retries.
    pub exhausted: usize,
    /// Could not be processed; see logs.
    pub errored: usize,
}

enum RetryOutcome {
    Skipped,
    Succeeded,
    Rescheduled,
    Exhausted,
}

// ── ProcessRetries ───────────────────────────────────────────────────────────

pub struct ProcessRetriesUseCase<E, D, T>
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

impl<E, D, T> ProcessRetriesUseCase<E, D, T>
where
    E: EndpointRepository,
    D: DeliveryRepository,
    T: DeliveryTransport,
{
    pub async fn execute(&self) -> Result<RetrySweepReport, WebhooksServiceError> {
        self.execute_at(Utc::now()).await
    }

    /// Resend every due delivery once. Only the initial query can fail the
    /// sweep; per-delivery errors are logged and counted.
    pub async fn execute_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RetrySweepReport, WebhooksServiceError> {
        let due = self
            .deliveries
            .list_due(now, self.policy.max_retries, self.policy.sweep_batch_size)
            .await?;

        let mut report = RetrySweepReport {
            due: due.len(),
            ..RetrySweepReport::default()
        };
        for delivery in &due {
            match self.retry_one(delivery, now).await {
                Ok(RetryOutcome::Skipped) => report.skipped += 1,
                Ok(RetryOutcome::Succeeded) => report.succeeded += 1,
                Ok(RetryOutcome::Rescheduled) => report.rescheduled += 1,
                Ok(RetryOutcome::Exhausted) => report.exhausted += 1,
                Err(e) => {
                    tracing::error!(
                        delivery_id = %delivery.id,
                        webhook_id = %delivery.webhook_id,
                        error = ?e,
                        "webhook retry failed"
                    );
                    report.errored += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                skipped = report.skipped,
                succeeded = report.succeeded,
                rescheduled = report.rescheduled,
                exhausted = report.exhausted,
                errored = report.errored,
                "webhook retry sweep finished"
            );
        }
        Ok(report)
    }

    async fn retry_one(
        &self,
        delivery: &WebhookDelivery,
        now: DateTime<Utc>,
    ) -> Result<RetryOutcome, WebhooksServiceError> {
        let endpoint = match self.endpoints.find_by_id(delivery.webhook_id).await? {
            Some(endpoint) if endpoint.is_active => endpoint,
            _ => return Ok(RetryOutcome::Skipped),
        };

        let lease_until = now + self.policy.retry_delay;
        if !self.deliveries.claim(delivery, lease_until).await? {
            tracing::debug!(delivery_id = %delivery.id, "webhook retry already claimed");
            return Ok(RetryOutcome::Skipped);
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
                return Ok(lost_claim(delivery));
            }
            tracing::info!(
                delivery_id = %delivery.id,
                webhook_id = %endpoint.id,
                retry_count = delivery.retry_count,
                "webhook retry delivered"
            );
            return Ok(RetryOutcome::Succeeded);
        }

        let retry_count = delivery.retry_count + 1;
        if retry_count >= self.policy.max_retries {
            let recorded = self
                .deliveries
                .update(
                    delivery.id,
                    delivery.retry_count,
                    &DeliveryUpdate::failure(&result, retry_count, None),
                )
                .await?;
            if !recorded {
                return Ok(lost_claim(delivery));
            }
            tracing::warn!(
                delivery_id = %delivery.id,
                webhook_id = %endpoint.id,
                retry_count,
                status_code = ?result.status_code,
                error = result.error_message.as_deref().unwrap_or_default(),
                "webhook delivery exhausted its retries"
            );
            FailureTracker {
                endpoints: &self.endpoints,
                policy: &self.policy,
            }
            .on_failure(endpoint.id, now)
            .await?;
            return Ok(RetryOutcome::Exhausted);
        }

        let recorded = self
            .deliveries
            .update(
                delivery.id,
                delivery.retry_count,
                &DeliveryUpdate::failure(&result, retry_count, Some(lease_until)),
            )
            .await?;
        if !recorded {
            return Ok(lost_claim(delivery));
        }
        tracing::debug!(
            delivery_id = %delivery.id,
            retry_count,
            next_retry_at = %lease_until,
            "webhook retry failed, rescheduled"
        );
        Ok(RetryOutcome::Rescheduled)
    }
}

/// The lease ran out mid-attempt and another worker re-claimed the row.
fn lost_claim(delivery: &WebhookDelivery) -> RetryOutcome {
    tracing::warn!(
        delivery_id = %delivery.id,
        "webhook retry outcome dropped, delivery was re-claimed"
    );
    RetryOutcome::Skipped
}
