use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WebhooksServiceError;

/// Registration lifecycle notification an endpoint can subscribe to.
///
/// Wire format: snake_case string, also used as the `type` tag of
/// [`Notification`](crate::domain::notification::Notification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RegistrationConfirmed,
    RegistrationCancelled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistrationConfirmed => "registration_confirmed",
            Self::RegistrationCancelled => "registration_cancelled",
        }
    }

    /// Parse the wire value. Returns `None` for unknown kinds.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration_confirmed" => Some(Self::RegistrationConfirmed),
            "registration_cancelled" => Some(Self::RegistrationCancelled),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom header sent with every request to an endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl AuthHeader {
    /// Pair up optional name and value. Both absent (or blank) means no header;
    /// exactly one present is an error.
    pub fn from_parts(
        name: Option<String>,
        value: Option<String>,
    ) -> Result<Option<Self>, WebhooksServiceError> {
        let name = name.filter(|n| !n.trim().is_empty());
        let value = value.filter(|v| !v.is_empty());
        match (name, value) {
            (Some(name), Some(value)) => Ok(Some(Self {
                name: name.trim().to_owned(),
                value,
            })),
            (None, None) => Ok(None),
            _ => Err(WebhooksServiceError::IncompleteAuthHeader),
        }
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Raw failure-tracking columns of an endpoint.
///
/// Compared as a whole when applying a state-machine transition, so a
/// concurrent writer invalidates a stale snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureTracking {
    pub is_active: bool,
    pub consecutive_failure_periods: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Where registration notifications for one event are sent.
#[derive(Debug, Clone)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub event_id: Uuid,
    pub url: String,
    pub auth_header: Option<AuthHeader>,
    pub event_types: Vec<NotificationKind>,
    pub is_active: bool,
    pub consecutive_failure_periods: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    pub fn subscribes_to(&self, kind: NotificationKind) -> bool {
        self.event_types.contains(&kind)
    }

    pub fn failure_tracking(&self) -> FailureTracking {
        FailureTracking {
            is_active: self.is_active,
            consecutive_failure_periods: self.consecutive_failure_periods,
            last_failure_at: self.last_failure_at,
        }
    }
}

/// Delivery lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One logical notification's delivery to one endpoint, across all attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: NotificationKind,
    /// Serialized envelope; resent byte-for-byte.
    pub payload: String,
    pub status: DeliveryStatus,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// `None` means no retry is scheduled.
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookDelivery {
    /// A freshly created delivery awaiting its first send.
    pub fn pending(
        webhook_id: Uuid,
        event_type: NotificationKind,
        payload: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            webhook_id,
            event_type,
            payload,
            status: DeliveryStatus::Pending,
            status_code: None,
            response_body: None,
            error_message: None,
            retry_count: 0,
            next_retry_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Failed with the automatic retry budget spent.
    pub fn is_terminal(&self, max_retries: u32) -> bool {
        self.status == DeliveryStatus::Failed && self.retry_count >= max_retries
    }
}

/// New values for the mutable columns of a delivery after a send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl DeliveryUpdate {
    /// Successful send: no error, nothing scheduled.
    pub fn success(result: &DeliveryResult, retry_count: u32) -> Self {
        Self {
            status: DeliveryStatus::Success,
            status_code: result.status_code,
            response_body: result.response_body.clone(),
            error_message: None,
            retry_count,
            next_retry_at: None,
        }
    }

    /// Failed send, optionally scheduling another attempt.
    pub fn failure(
        result: &DeliveryResult,
        retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            status_code: result.status_code,
            response_body: result.response_body.clone(),
            error_message: result.error_message.clone(),
            retry_count,
            next_retry_at,
        }
    }
}

/// Outcome of one outbound HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    /// True only for HTTP 200.
    pub success: bool,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(status_code: u16, response_body: Option<String>) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            response_body,
            error_message: None,
        }
    }

    /// Endpoint answered with anything other than 200.
    pub fn rejected(status_code: u16, reason: &str, response_body: Option<String>) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            response_body,
            error_message: Some(format!("HTTP {status_code}: {reason}")),
        }
    }

    pub fn timed_out() -> Self {
        Self::errored("Request timeout")
    }

    /// No HTTP response (connect/TLS/protocol error).
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: None,
            response_body: None,
            error_message: Some(message.into()),
        }
    }
}
