//! Notification shapes sent to webhook endpoints, and the builders that
//! derive them from registration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use rsvp_domain::event::Event;
use rsvp_domain::registration::{Registration, RegistrationStatus};
use rsvp_domain::ticket::Ticket;

use crate::domain::token::verification_token;
use crate::domain::types::NotificationKind;

/// Body of every webhook request. Always one notification today; the array
/// leaves room for batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub notifications: Vec<Notification>,
}

impl WebhookPayload {
    pub fn single(notification: Notification) -> Self {
        Self {
            notifications: vec![notification],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    RegistrationConfirmed(RegistrationConfirmed),
    RegistrationCancelled(RegistrationCancelled),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::RegistrationConfirmed(_) => NotificationKind::RegistrationConfirmed,
            Self::RegistrationCancelled(_) => NotificationKind::RegistrationCancelled,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::RegistrationConfirmed(n) => &n.registration.token,
            Self::RegistrationCancelled(n) => &n.registration.token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfirmed {
    pub event: EventInfo,
    pub registration: ConfirmedRegistrationInfo,
    pub ticket: TicketInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationCancelled {
    pub event: EventInfo,
    pub registration: CancelledRegistrationInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub start_date: DateTime<Utc>,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedRegistrationInfo {
    pub id: Uuid,
    pub status: RegistrationStatus,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledRegistrationInfo {
    pub id: Uuid,
    pub status: RegistrationStatus,
    #[serde(serialize_with = "rsvp_core::serde::to_rfc3339_ms")]
    pub cancelled_at: DateTime<Utc>,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    pub id: Uuid,
    pub name: String,
    /// Minor currency units.
    pub price: i64,
    pub attendee: Option<String>,
}

impl From<&Event> for EventInfo {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
        }
    }
}

/// Build the notification for a registration that has just been confirmed.
pub fn build_confirmed(event: &Event, registration: &Registration, ticket: &Ticket) -> Notification {
    let form_data = registration.form_data.as_deref().map(parse_form_data);
    let attendee = form_data.as_ref().and_then(attendee_name);
    Notification::RegistrationConfirmed(RegistrationConfirmed {
        event: EventInfo::from(event),
        registration: ConfirmedRegistrationInfo {
            id: registration.id,
            status: registration.status,
            created_at: registration.created_at,
            email: registration.email.clone(),
            token: verification_token(registration.id, registration.created_at),
        },
        ticket: TicketInfo {
            id: ticket.id,
            name: ticket.name.clone(),
            price: ticket.price,
            attendee,
        },
        form_data,
    })
}

/// Build the notification for a cancelled registration.
///
/// The token is derived from the original `created_at`, never the
/// cancellation time, so it matches the confirmation's token.
pub fn build_cancelled(event: &Event, registration: &Registration) -> Notification {
    Notification::RegistrationCancelled(RegistrationCancelled {
        event: EventInfo::from(event),
        registration: CancelledRegistrationInfo {
            id: registration.id,
            status: RegistrationStatus::Cancelled,
            cancelled_at: registration.updated_at,
            token: verification_token(registration.id, registration.created_at),
        },
    })
}

fn parse_form_data(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::debug!("registration form data is not a JSON object, sending empty map");
            Map::new()
        }
    }
}

fn non_empty_str<'a>(form: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| form.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Attendee display name from registration form answers.
fn attendee_name(form: &Map<String, Value>) -> Option<String> {
    if let Some(full) = non_empty_str(form, &["name", "fullName", "full_name"]) {
        return Some(full.to_owned());
    }
    let first = non_empty_str(form, &["firstName", "first_name"]);
    let last = non_empty_str(form, &["lastName", "last_name"]);
    match (first, last) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
        (None, None) => None,
    }
}

/// Fixed payload used to probe an endpoint before it is saved: one
/// confirmation and one cancellation with placeholder ids and a real token.
pub fn sample_payload() -> WebhookPayload {
    // 2024-01-01T00:00:00Z
    let created_at = sample_time(1_704_067_200);
    let event = Event {
        id: Uuid::from_u128(1),
        name: "Sample Conference".to_owned(),
        start_date: sample_time(1_717_232_400),
        end_date: sample_time(1_717_351_200),
    };
    let ticket = Ticket {
        id: Uuid::from_u128(2),
        event_id: event.id,
        name: "General Admission".to_owned(),
        price: 10_000,
    };
    let confirmed = Registration {
        id: Uuid::from_u128(3),
        event_id: event.id,
        ticket_id: ticket.id,
        email: "attendee@example.com".to_owned(),
        status: RegistrationStatus::Confirmed,
        form_data: Some(r#"{"name":"Sample Attendee"}"#.to_owned()),
        created_at,
        updated_at: created_at,
    };
    let cancelled = Registration {
        id: Uuid::from_u128(4),
        status: RegistrationStatus::Cancelled,
        form_data: None,
        updated_at: sample_time(1_704_153_600),
        ..confirmed.clone()
    };

    WebhookPayload {
        notifications: vec![
            build_confirmed(&event, &confirmed, &ticket),
            build_cancelled(&event, &cancelled),
        ],
    }
}

fn sample_time(unix_secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(unix_secs)
}
