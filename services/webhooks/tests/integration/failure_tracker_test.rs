use rsvp_webhooks::domain::failure::EndpointHealth;
use rsvp_webhooks::domain::policy::WebhookPolicy;
use rsvp_webhooks::domain::types::FailureTracking;
use rsvp_webhooks::usecase::failure_tracker::FailureTracker;

use crate::helpers::{Harness, MockTransport, minutes, t0, test_endpoint};

#[tokio::test]
async fn should_walk_endpoint_from_healthy_to_disabled() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    let health = tracker.on_failure(endpoint.id, t0()).await.unwrap();
    assert_eq!(
        health,
        Some(EndpointHealth::Observing {
            since: t0(),
            periods: 0
        })
    );

    let health = tracker.on_failure(endpoint.id, t0() + minutes(20)).await.unwrap();
    assert_eq!(
        health,
        Some(EndpointHealth::Observing {
            since: t0() + minutes(20),
            periods: 1
        })
    );

    tracker.on_failure(endpoint.id, t0() + minutes(40)).await.unwrap();
    let health = tracker.on_failure(endpoint.id, t0() + minutes(60)).await.unwrap();
    assert!(health.unwrap().is_disabled());

    let stored = h.endpoint(endpoint.id);
    assert!(!stored.is_active);
    assert_eq!(stored.consecutive_failure_periods, 3);
    assert_eq!(stored.last_failure_at, Some(t0() + minutes(60)));
}

#[tokio::test]
async fn should_ignore_unknown_endpoint() {
    let h = Harness::new(MockTransport::ok());
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    let health = tracker.on_failure(uuid::Uuid::new_v4(), t0()).await.unwrap();

    assert_eq!(health, None);
}

#[tokio::test]
async fn should_stay_observing_when_no_failure_follows_closed_window() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    tracker.on_failure(endpoint.id, t0()).await.unwrap();

    // Hours later, with nothing else happening, the stored state is unchanged:
    // windows are only evaluated when a failure arrives.
    let stored = h.endpoint(endpoint.id);
    assert_eq!(stored.last_failure_at, Some(t0()));
    assert_eq!(stored.consecutive_failure_periods, 0);
    assert!(stored.is_active);
}

#[tokio::test]
async fn should_reset_counters_without_reenabling() {
    let mut endpoint = test_endpoint();
    endpoint.is_active = false;
    endpoint.consecutive_failure_periods = 3;
    endpoint.last_failure_at = Some(t0());
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    tracker.on_success(endpoint.id).await.unwrap();

    let stored = h.endpoint(endpoint.id);
    assert!(!stored.is_active);
    assert_eq!(stored.consecutive_failure_periods, 0);
    assert_eq!(stored.last_failure_at, None);
}

#[tokio::test]
async fn should_reapply_transition_after_concurrent_update() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    // Another worker opens the window at t0 while this one is deciding.
    h.store
        .lock()
        .unwrap()
        .concurrent_writes
        .push_back(FailureTracking {
            is_active: true,
            consecutive_failure_periods: 0,
            last_failure_at: Some(t0()),
        });
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    let health = tracker
        .on_failure(endpoint.id, t0() + minutes(25))
        .await
        .unwrap();

    // Re-read sees the concurrent window and closes it instead of opening a new one.
    assert_eq!(
        health,
        Some(EndpointHealth::Observing {
            since: t0() + minutes(25),
            periods: 1
        })
    );
}

#[tokio::test]
async fn should_give_up_after_repeated_conflicts() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    {
        let mut store = h.store.lock().unwrap();
        for n in 0..3 {
            store.concurrent_writes.push_back(FailureTracking {
                is_active: true,
                consecutive_failure_periods: 0,
                last_failure_at: Some(t0() + minutes(n)),
            });
        }
    }
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &h.policy,
    };

    let health = tracker
        .on_failure(endpoint.id, t0() + minutes(100))
        .await
        .unwrap();

    assert_eq!(health, None);
    // The last concurrent write stands.
    assert_eq!(h.endpoint(endpoint.id).last_failure_at, Some(t0() + minutes(2)));
}

#[tokio::test]
async fn should_honour_shortened_policy_windows() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let policy = WebhookPolicy {
        observation_period: chrono::Duration::seconds(1),
        max_consecutive_failure_periods: 2,
        ..WebhookPolicy::default()
    };
    let endpoints = h.endpoints();
    let tracker = FailureTracker {
        endpoints: &endpoints,
        policy: &policy,
    };

    for offset in [0, 1, 2] {
        tracker
            .on_failure(endpoint.id, t0() + chrono::Duration::seconds(offset))
            .await
            .unwrap();
    }

    assert!(!h.endpoint(endpoint.id).is_active);
}
