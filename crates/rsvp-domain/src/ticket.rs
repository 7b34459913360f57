//! Ticket types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ticket tier offered for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    /// Price in minor currency units (cents). Free tickets are `0`.
    pub price: i64,
}

impl Ticket {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}
