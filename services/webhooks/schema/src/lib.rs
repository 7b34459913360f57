//! sea-orm entities for the webhooks service.

pub mod webhook_deliveries;
pub mod webhook_endpoints;
