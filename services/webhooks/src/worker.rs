use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Run the retry sweep every `interval` until the task is dropped.
///
/// A sweep that outlasts the interval delays the next one instead of
/// queueing a burst of catch-up ticks.
pub async fn run_retry_sweeper(state: AppState, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let sweeper = state.retry_sweeper();

    tracing::info!(interval_secs = interval.as_secs(), "retry sweeper started");
    loop {
        ticker.tick().await;
        if let Err(e) = sweeper.execute().await {
            tracing::error!(error = ?e, "webhook retry sweep failed");
        }
    }
}
