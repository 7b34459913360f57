//! Auto-disable state machine for webhook endpoints.
//!
//! An endpoint is disabled only after `max_consecutive_failure_periods`
//! observation windows in a row saw nothing but failures. Any success resets
//! tracking to healthy.
//!
//! ```text
//!            failure                       failure, window closed (n+1 < max)
//! Healthy ───────────▶ Observing(now, 0) ─────────────────────────▶ Observing(now, n+1)
//!    ▲                     │   ▲  │ failure, window open                  │
//!    │      success        │   └──┘                                       │
//!    └─────────────────────┘                                              │
//!                          failure, window closed (n+1 == max)            ▼
//!                                                             Disabled(now, max)
//! ```
//!
//! A window only closes when another failure arrives after it has elapsed.
//! An endpoint that fails once and is never tried again stays `Observing`.

use chrono::{DateTime, Utc};

use crate::domain::policy::WebhookPolicy;
use crate::domain::types::FailureTracking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    /// No failure since the last success.
    Healthy,
    /// Failures seen; `since` opened the current window, `periods` closed
    /// windows have been entirely failing.
    Observing { since: DateTime<Utc>, periods: u32 },
    /// Switched off. Only an operator turns it back on.
    Disabled {
        since: Option<DateTime<Utc>>,
        periods: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureEvent {
    Success,
    Failure,
}

impl EndpointHealth {
    pub fn transition(
        self,
        event: FailureEvent,
        now: DateTime<Utc>,
        policy: &WebhookPolicy,
    ) -> Self {
        match (self, event) {
            (Self::Disabled { .. }, FailureEvent::Success) => Self::Disabled {
                since: None,
                periods: 0,
            },
            (Self::Disabled { .. }, FailureEvent::Failure) => self,
            (_, FailureEvent::Success) => Self::Healthy,
            (Self::Healthy, FailureEvent::Failure) => Self::Observing {
                since: now,
                periods: 0,
            },
            (Self::Observing { since, periods }, FailureEvent::Failure) => {
                if now - since < policy.observation_period {
                    return self;
                }
                let periods = periods + 1;
                if periods >= policy.max_consecutive_failure_periods {
                    Self::Disabled {
                        since: Some(now),
                        periods,
                    }
                } else {
                    Self::Observing {
                        since: now,
                        periods,
                    }
                }
            }
        }
    }

    pub fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled { .. })
    }
}

impl From<FailureTracking> for EndpointHealth {
    fn from(tracking: FailureTracking) -> Self {
        match (tracking.is_active, tracking.last_failure_at) {
            (false, since) => Self::Disabled {
                since,
                periods: tracking.consecutive_failure_periods,
            },
            (true, None) => Self::Healthy,
            (true, Some(since)) => Self::Observing {
                since,
                periods: tracking.consecutive_failure_periods,
            },
        }
    }
}

impl From<EndpointHealth> for FailureTracking {
    fn from(health: EndpointHealth) -> Self {
        match health {
            EndpointHealth::Healthy => Self {
                is_active: true,
                consecutive_failure_periods: 0,
                last_failure_at: None,
            },
            EndpointHealth::Observing { since, periods } => Self {
                is_active: true,
                consecutive_failure_periods: periods,
                last_failure_at: Some(since),
            },
            EndpointHealth::Disabled { since, periods } => Self {
                is_active: false,
                consecutive_failure_periods: periods,
                last_failure_at: since,
            },
        }
    }
}
