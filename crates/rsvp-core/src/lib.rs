//! Service plumbing shared by RSVP backend services.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
