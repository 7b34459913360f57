//! Registration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a registration.
///
/// Wire format: lowercase string (`"pending"`, `"confirmed"`, `"cancelled"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the wire value. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// An attendee's registration for one ticket of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_id: Uuid,
    pub email: String,
    pub status: RegistrationStatus,
    /// Raw JSON object of answers to the event's registration form.
    pub form_data: Option<String>,
    /// Immutable; identity-bearing (verification tokens derive from it).
    pub created_at: DateTime<Utc>,
    /// Last status change. For a cancelled registration this is the
    /// cancellation time.
    pub updated_at: DateTime<Utc>,
}
