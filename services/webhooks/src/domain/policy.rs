use chrono::Duration;

/// Timing and budget knobs for delivery retries and auto-disable.
///
/// Injected into the dispatcher, retry sweeper and failure tracker so tests can
/// shrink the windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookPolicy {
    /// Delay before each automatic retry of a failed delivery.
    pub retry_delay: Duration,
    /// Automatic retries per delivery before it becomes terminal.
    pub max_retries: u32,
    /// Length of one failure observation window.
    pub observation_period: Duration,
    /// Fully-failing windows in a row that disable an endpoint.
    pub max_consecutive_failure_periods: u32,
    /// Upper bound on deliveries picked up by one retry sweep.
    pub sweep_batch_size: u64,
}

impl Default for WebhookPolicy {
    fn default() -> Self {
        Self {
            retry_delay: Duration::minutes(5),
            max_retries: 3,
            observation_period: Duration::minutes(20),
            max_consecutive_failure_periods: 3,
            sweep_batch_size: 100,
        }
    }
}
