use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::failure::{EndpointHealth, FailureEvent};
use crate::domain::policy::WebhookPolicy;
use crate::domain::repository::EndpointRepository;
use crate::domain::types::FailureTracking;
use crate::error::WebhooksServiceError;

/// Attempts at applying a failure before giving up on a contended endpoint.
const MAX_CAS_ATTEMPTS: usize = 3;

/// Applies delivery outcomes to an endpoint's auto-disable state.
pub struct FailureTracker<'a, E: EndpointRepository> {
    pub endpoints: &'a E,
    pub policy: &'a WebhookPolicy,
}

impl<E: EndpointRepository> FailureTracker<'_, E> {
    /// Record a terminal send failure. Returns the endpoint's resulting
    /// health, or `None` when the endpoint no longer exists.
    pub async fn on_failure(
        &self,
        webhook_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<EndpointHealth>, WebhooksServiceError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(endpoint) = self.endpoints.find_by_id(webhook_id).await? else {
                return Ok(None);
            };
            let expected = endpoint.failure_tracking();
            let current = EndpointHealth::from(expected);
            let next = current.transition(FailureEvent::Failure, now, self.policy);
            if next == current {
                return Ok(Some(current));
            }

            let written = self
                .endpoints
                .compare_and_set_failure_tracking(
                    webhook_id,
                    &expected,
                    &FailureTracking::from(next),
                )
                .await?;
            if written {
                if next.is_disabled() {
                    tracing::warn!(
                        %webhook_id,
                        event_id = %endpoint.event_id,
                        url = %endpoint.url,
                        "webhook endpoint disabled after consecutive failure periods"
                    );
                }
                return Ok(Some(next));
            }
            tracing::debug!(%webhook_id, attempt, "failure tracking changed concurrently, retrying");
        }

        tracing::warn!(%webhook_id, "gave up recording endpoint failure after concurrent updates");
        Ok(None)
    }

    /// Clear the failure counter and window. A disabled endpoint stays disabled.
    pub async fn on_success(&self, webhook_id: Uuid) -> Result<(), WebhooksServiceError> {
        self.endpoints.reset_failure_tracking(webhook_id).await
    }
}
