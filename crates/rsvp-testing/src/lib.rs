//! Test utilities for RSVP services.
//!
//! Import from `[dev-dependencies]` only — never in production code.

pub mod receiver;
