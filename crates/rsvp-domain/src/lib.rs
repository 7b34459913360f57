//! Registration-domain records shared across RSVP services.
//!
//! Pure types only, no framework dependencies. The registration app owns these
//! records; other services receive them as read-only snapshots.

pub mod event;
pub mod pagination;
pub mod registration;
pub mod ticket;
