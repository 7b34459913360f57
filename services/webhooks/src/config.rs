use std::time::Duration;

use serde::Deserialize;

use crate::domain::policy::WebhookPolicy;

/// Webhooks service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhooksConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `WEBHOOKS_PORT`.
    #[serde(default = "default_webhooks_port")]
    pub webhooks_port: u16,
    /// Seconds between retry sweeps; `0` disables the in-process loop.
    #[serde(default = "default_retry_sweep_interval_secs")]
    pub retry_sweep_interval_secs: u64,
    /// Maximum deliveries resent by one sweep.
    #[serde(default = "default_retry_sweep_batch_size")]
    pub retry_sweep_batch_size: u64,
    /// Per-request timeout for outbound webhook calls.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: i64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_observation_period_secs")]
    pub observation_period_secs: i64,
    #[serde(default = "default_max_consecutive_failure_periods")]
    pub max_consecutive_failure_periods: u32,
}

impl rsvp_core::config::Config for WebhooksConfig {}

fn default_webhooks_port() -> u16 {
    3114
}

fn default_retry_sweep_interval_secs() -> u64 {
    60
}

fn default_retry_sweep_batch_size() -> u64 {
    100
}

fn default_delivery_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> i64 {
    WebhookPolicy::default().retry_delay.num_seconds()
}

fn default_max_retries() -> u32 {
    WebhookPolicy::default().max_retries
}

fn default_observation_period_secs() -> i64 {
    WebhookPolicy::default().observation_period.num_seconds()
}

fn default_max_consecutive_failure_periods() -> u32 {
    WebhookPolicy::default().max_consecutive_failure_periods
}

impl WebhooksConfig {
    pub fn policy(&self) -> WebhookPolicy {
        WebhookPolicy {
            retry_delay: chrono::Duration::seconds(self.retry_delay_secs),
            max_retries: self.max_retries,
            observation_period: chrono::Duration::seconds(self.observation_period_secs),
            max_consecutive_failure_periods: self.max_consecutive_failure_periods,
            sweep_batch_size: self.retry_sweep_batch_size,
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// `None` when the in-process sweep loop is disabled.
    pub fn retry_sweep_interval(&self) -> Option<Duration> {
        (self.retry_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.retry_sweep_interval_secs))
    }
}
