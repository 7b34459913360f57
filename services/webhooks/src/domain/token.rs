use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use rsvp_core::serde::rfc3339_ms;

/// Verification token for a registration: lowercase hex
/// `SHA-256(registration_id ++ created_at)`.
///
/// `created_at` is rendered as RFC 3339 UTC with milliseconds
/// (`2024-01-01T00:00:00.000Z`). Both inputs are immutable, so confirmation and
/// cancellation notifications for the same registration carry the same token,
/// and a receiver holding the two fields can recompute it.
pub fn verification_token(registration_id: Uuid, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(registration_id.to_string().as_bytes());
    hasher.update(rfc3339_ms(&created_at).as_bytes());
    hex::encode(hasher.finalize())
}
