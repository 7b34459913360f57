use rsvp_webhooks::domain::failure::EndpointHealth;
use rsvp_webhooks::domain::notification::WebhookPayload;
use rsvp_webhooks::domain::types::{DeliveryStatus, NotificationKind};
use rsvp_webhooks::usecase::dispatch::{DispatchInput, DispatchOutcome, SkipReason};

use crate::helpers::{
    Harness, MockTransport, cancelled_notification, confirmed_notification, minutes, t0,
    test_endpoint, test_event,
};

fn confirmed_input() -> DispatchInput {
    DispatchInput {
        event_id: test_event().id,
        notification: confirmed_notification(),
    }
}

#[tokio::test]
async fn should_record_success_and_reset_tracking_when_endpoint_returns_200() {
    let mut endpoint = test_endpoint();
    endpoint.consecutive_failure_periods = 1;
    endpoint.last_failure_at = Some(t0() - minutes(30));
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    let DispatchOutcome::Delivered { delivery_id } = outcome else {
        panic!("expected Delivered, got {outcome:?}");
    };
    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.status, DeliveryStatus::Success);
    assert_eq!(delivery.status_code, Some(200));
    assert_eq!(delivery.response_body.as_deref(), Some("ok"));
    assert_eq!(delivery.retry_count, 0);
    assert_eq!(delivery.next_retry_at, None);
    assert_eq!(delivery.error_message, None);

    let endpoint = h.endpoint(endpoint.id);
    assert_eq!(endpoint.consecutive_failure_periods, 0);
    assert_eq!(endpoint.last_failure_at, None);
    assert!(endpoint.is_active);
}

#[tokio::test]
async fn should_send_single_notification_envelope_with_auth_header() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;
    let DispatchOutcome::Delivered { delivery_id } = outcome else {
        panic!("expected Delivered, got {outcome:?}");
    };

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, endpoint.url);
    assert_eq!(sent[0].auth_header, endpoint.auth_header);

    let payload: WebhookPayload = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(payload, WebhookPayload::single(confirmed_notification()));
    // The stored payload is exactly what went over the wire.
    assert_eq!(h.delivery(delivery_id).payload, sent[0].body);
}

#[tokio::test]
async fn should_schedule_retry_and_open_window_when_endpoint_returns_500() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    let DispatchOutcome::Failed {
        delivery_id,
        next_retry_at,
    } = outcome
    else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(next_retry_at, t0() + minutes(5));

    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert_eq!(delivery.retry_count, 0);
    assert_eq!(delivery.next_retry_at, Some(t0() + minutes(5)));
    assert_eq!(delivery.status_code, Some(500));
    assert_eq!(
        delivery.error_message.as_deref(),
        Some("HTTP 500: Internal Server Error")
    );

    let endpoint = h.endpoint(endpoint.id);
    assert_eq!(endpoint.last_failure_at, Some(t0()));
    assert_eq!(endpoint.consecutive_failure_periods, 0);
    assert!(endpoint.is_active);
}

#[tokio::test]
async fn should_treat_non_200_success_code_as_failure() {
    let h = Harness::with_endpoint(test_endpoint(), MockTransport::failing(201));

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    assert!(
        matches!(outcome, DispatchOutcome::Failed { .. }),
        "expected Failed, got {outcome:?}"
    );
    let deliveries = h.all_deliveries();
    assert_eq!(deliveries[0].status_code, Some(201));
    assert_eq!(deliveries[0].error_message.as_deref(), Some("HTTP 201: Created"));
}

#[tokio::test]
async fn should_skip_when_no_endpoint_configured() {
    let h = Harness::new(MockTransport::ok());

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Skipped {
            reason: SkipReason::NoEndpoint
        }
    );
    assert!(h.transport.sent().is_empty());
    assert!(h.all_deliveries().is_empty());
}

#[tokio::test]
async fn should_skip_when_endpoint_inactive() {
    let mut endpoint = test_endpoint();
    endpoint.is_active = false;
    let h = Harness::with_endpoint(endpoint, MockTransport::ok());

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Skipped {
            reason: SkipReason::Inactive
        }
    );
    assert!(h.transport.sent().is_empty());
    assert!(h.all_deliveries().is_empty());
}

#[tokio::test]
async fn should_skip_unsubscribed_event_type() {
    let mut endpoint = test_endpoint();
    endpoint.event_types = vec![NotificationKind::RegistrationConfirmed];
    let h = Harness::with_endpoint(endpoint, MockTransport::ok());

    let outcome = h
        .dispatcher()
        .execute_at(
            DispatchInput {
                event_id: test_event().id,
                notification: cancelled_notification(),
            },
            t0(),
        )
        .await;

    assert_eq!(
        outcome,
        DispatchOutcome::Skipped {
            reason: SkipReason::NotSubscribed
        }
    );
    assert!(h.all_deliveries().is_empty());
}

#[tokio::test]
async fn should_abort_without_sending_when_delivery_cannot_be_stored() {
    let h = Harness::with_endpoint(test_endpoint(), MockTransport::ok());
    h.store.lock().unwrap().fail_delivery_writes = true;

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    assert_eq!(outcome, DispatchOutcome::Aborted { delivery_id: None });
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn should_report_stored_delivery_when_outcome_cannot_be_recorded() {
    let h = Harness::with_endpoint(test_endpoint(), MockTransport::ok());
    h.store.lock().unwrap().fail_outcome_writes = true;

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;

    let DispatchOutcome::Aborted {
        delivery_id: Some(delivery_id),
    } = outcome
    else {
        panic!("expected Aborted with a delivery id, got {outcome:?}");
    };
    assert_eq!(h.transport.sent().len(), 1);
    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.status, DeliveryStatus::Pending);
    assert_eq!(delivery.next_retry_at, Some(t0() + minutes(5)));
}

#[tokio::test]
async fn should_not_advance_window_for_failures_within_observation_period() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(503));

    for offset in [0, 5, 19] {
        h.dispatcher()
            .execute_at(confirmed_input(), t0() + minutes(offset))
            .await;
    }

    let tracked = h.endpoint(endpoint.id);
    assert_eq!(
        EndpointHealth::from(tracked.failure_tracking()),
        EndpointHealth::Observing {
            since: t0(),
            periods: 0
        }
    );
    assert_eq!(h.all_deliveries().len(), 3);
}

#[tokio::test]
async fn should_disable_endpoint_after_consecutive_failing_periods() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));

    for offset in [0, 20, 40, 60] {
        h.dispatcher()
            .execute_at(confirmed_input(), t0() + minutes(offset))
            .await;
    }

    let disabled = h.endpoint(endpoint.id);
    assert!(!disabled.is_active);
    assert_eq!(disabled.consecutive_failure_periods, 3);
    assert_eq!(disabled.last_failure_at, Some(t0() + minutes(60)));

    // Later dispatches are skipped entirely.
    let sent_before = h.transport.sent().len();
    let outcome = h
        .dispatcher()
        .execute_at(confirmed_input(), t0() + minutes(61))
        .await;
    assert_eq!(
        outcome,
        DispatchOutcome::Skipped {
            reason: SkipReason::Inactive
        }
    );
    assert_eq!(h.transport.sent().len(), sent_before);
}

#[tokio::test]
async fn should_serialize_outcome_with_tag() {
    let h = Harness::with_endpoint(test_endpoint(), MockTransport::failing(500));

    let outcome = h.dispatcher().execute_at(confirmed_input(), t0()).await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["outcome"], "failed");
    assert_eq!(json["next_retry_at"], "2024-05-01T09:05:00.000Z");
    assert_eq!(
        serde_json::to_value(DispatchOutcome::Aborted { delivery_id: None }).unwrap()["outcome"],
        "aborted"
    );
}
