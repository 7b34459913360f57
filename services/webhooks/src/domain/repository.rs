#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rsvp_domain::pagination::{Page, PageRequest};

use crate::domain::types::{
    AuthHeader, DeliveryResult, DeliveryUpdate, FailureTracking, WebhookDelivery, WebhookEndpoint,
};
use crate::error::WebhooksServiceError;

/// Repository for webhook endpoint configuration and failure tracking.
pub trait EndpointRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        event_id: Uuid,
    ) -> Result<Option<WebhookEndpoint>, WebhooksServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEndpoint>, WebhooksServiceError>;

    /// Write `next` only if the tracking columns still equal `expected`.
    /// Returns `false` when the row changed underneath (or is gone).
    async fn compare_and_set_failure_tracking(
        &self,
        id: Uuid,
        expected: &FailureTracking,
        next: &FailureTracking,
    ) -> Result<bool, WebhooksServiceError>;

    /// Clear the failure counter and window. Leaves `is_active` alone.
    async fn reset_failure_tracking(&self, id: Uuid) -> Result<(), WebhooksServiceError>;
}

/// Repository for delivery records.
pub trait DeliveryRepository: Send + Sync {
    async fn create(&self, delivery: &WebhookDelivery) -> Result<(), WebhooksServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookDelivery>, WebhooksServiceError>;

    /// Take a delivery for one send attempt: flips it to `pending` with
    /// `next_retry_at = lease_until`, but only if `status`, `retry_count` and
    /// `next_retry_at` still match the snapshot. Returns `false` when another
    /// worker got there first.
    async fn claim(
        &self,
        delivery: &WebhookDelivery,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, WebhooksServiceError>;

    /// Record the outcome of a claimed attempt. Applies only while the row is
    /// still `pending` with `claimed_retry_count`; returns whether it did.
    async fn update(
        &self,
        id: Uuid,
        claimed_retry_count: u32,
        update: &DeliveryUpdate,
    ) -> Result<bool, WebhooksServiceError>;

    /// Record a successful claimed attempt and reset the endpoint's failure
    /// tracking in one transaction. Nothing is written when the claim was
    /// lost.
    async fn complete_with_endpoint_reset(
        &self,
        id: Uuid,
        claimed_retry_count: u32,
        update: &DeliveryUpdate,
        webhook_id: Uuid,
    ) -> Result<bool, WebhooksServiceError>;

    /// Deliveries with retry budget left whose `next_retry_at` has passed,
    /// oldest first: `failed` rows, plus `pending` rows whose lease expired.
    async fn list_due(
        &self,
        now: DateTime<Utc>,
        max_retries: u32,
        limit: u64,
    ) -> Result<Vec<WebhookDelivery>, WebhooksServiceError>;

    /// Failed deliveries that exhausted their retry budget, newest first.
    async fn list_terminal_failures(
        &self,
        webhook_id: Uuid,
        max_retries: u32,
        page: PageRequest,
    ) -> Result<Page<WebhookDelivery>, WebhooksServiceError>;
}

/// Outbound HTTP POST to a webhook endpoint.
///
/// Never fails: every problem is reported in the returned [`DeliveryResult`].
pub trait DeliveryTransport: Send + Sync {
    async fn send(&self, url: &str, body: &str, auth_header: Option<&AuthHeader>)
    -> DeliveryResult;
}
