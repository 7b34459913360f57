use rsvp_webhooks::domain::failure::EndpointHealth;
use rsvp_webhooks::domain::types::DeliveryStatus;
use rsvp_webhooks::usecase::dispatch::{DispatchInput, DispatchOutcome};
use rsvp_webhooks::usecase::retry::RetrySweepReport;

use crate::helpers::{
    Harness, MockTransport, confirmed_notification, failed_delivery, minutes, ok_result,
    rejected_result, t0, test_endpoint, test_event,
};

/// Dispatch once against a failing receiver; returns the delivery id.
async fn failed_dispatch(h: &Harness) -> uuid::Uuid {
    let outcome = h
        .dispatcher()
        .execute_at(
            DispatchInput {
                event_id: test_event().id,
                notification: confirmed_notification(),
            },
            t0(),
        )
        .await;
    match outcome {
        DispatchOutcome::Failed { delivery_id, .. } => delivery_id,
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn should_leave_delivery_untouched_before_next_retry_at() {
    let h = Harness::with_endpoint(test_endpoint(), MockTransport::failing(500));
    let delivery_id = failed_dispatch(&h).await;
    let before = h.delivery(delivery_id);

    let report = h.sweeper().execute_at(t0() + minutes(4)).await.unwrap();

    assert_eq!(report, RetrySweepReport::default());
    assert_eq!(h.delivery(delivery_id), before);
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn should_mark_success_and_reset_tracking_when_due_retry_succeeds() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));
    let delivery_id = failed_dispatch(&h).await;
    assert_eq!(h.endpoint(endpoint.id).last_failure_at, Some(t0()));

    h.transport.set_fallback(ok_result());
    let report = h.sweeper().execute_at(t0() + minutes(5)).await.unwrap();

    assert_eq!(report.due, 1);
    assert_eq!(report.succeeded, 1);
    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.status, DeliveryStatus::Success);
    assert_eq!(delivery.status_code, Some(200));
    assert_eq!(delivery.error_message, None);
    assert_eq!(delivery.next_retry_at, None);

    let endpoint = h.endpoint(endpoint.id);
    assert_eq!(endpoint.last_failure_at, None);
    assert_eq!(endpoint.consecutive_failure_periods, 0);
}

#[tokio::test]
async fn should_exhaust_after_three_failed_retries_and_notify_tracker_once() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));
    let delivery_id = failed_dispatch(&h).await;
    let observing_since_dispatch = EndpointHealth::Observing {
        since: t0(),
        periods: 0,
    };

    // First retry: rescheduled.
    let report = h.sweeper().execute_at(t0() + minutes(5)).await.unwrap();
    assert_eq!(report.rescheduled, 1);
    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.retry_count, 1);
    assert_eq!(delivery.next_retry_at, Some(t0() + minutes(10)));

    // Second retry, after the observation window closed: still only
    // rescheduled, and the tracker is not consulted.
    let report = h.sweeper().execute_at(t0() + minutes(21)).await.unwrap();
    assert_eq!(report.rescheduled, 1);
    assert_eq!(h.delivery(delivery_id).retry_count, 2);
    assert_eq!(
        EndpointHealth::from(h.endpoint(endpoint.id).failure_tracking()),
        observing_since_dispatch
    );

    // Third retry exhausts the budget and records one more failure.
    let report = h.sweeper().execute_at(t0() + minutes(26)).await.unwrap();
    assert_eq!(report.exhausted, 1);
    let delivery = h.delivery(delivery_id);
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert_eq!(delivery.retry_count, 3);
    assert_eq!(delivery.next_retry_at, None);
    assert_eq!(
        EndpointHealth::from(h.endpoint(endpoint.id).failure_tracking()),
        EndpointHealth::Observing {
            since: t0() + minutes(26),
            periods: 1
        }
    );

    // Terminal: never picked up again.
    let report = h.sweeper().execute_at(t0() + minutes(600)).await.unwrap();
    assert_eq!(report.due, 0);
    assert_eq!(h.transport.sent().len(), 4);
}

#[tokio::test]
async fn should_resend_stored_payload_verbatim() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let mut delivery = failed_delivery(endpoint.id, 1, Some(t0()));
    // Deliberately unusual formatting: must not be re-serialized.
    delivery.payload = "{ \"notifications\" : [ ] ,\"x\":1 }".to_owned();
    h.insert_delivery(delivery.clone());

    h.sweeper().execute_at(t0()).await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, delivery.payload);
    assert_eq!(sent[0].url, endpoint.url);
    assert_eq!(sent[0].auth_header, endpoint.auth_header);
}

#[tokio::test]
async fn should_use_current_endpoint_url_on_retry() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    h.insert_delivery(failed_delivery(endpoint.id, 0, Some(t0())));
    {
        let mut store = h.store.lock().unwrap();
        store.endpoints[0].url = "https://new.example.com/hook".to_owned();
    }

    h.sweeper().execute_at(t0()).await.unwrap();

    assert_eq!(h.transport.sent()[0].url, "https://new.example.com/hook");
}

#[tokio::test]
async fn should_skip_deliveries_of_inactive_or_missing_endpoints() {
    let mut inactive = test_endpoint();
    inactive.is_active = false;
    let h = Harness::with_endpoint(inactive.clone(), MockTransport::ok());
    let parked = failed_delivery(inactive.id, 1, Some(t0()));
    let orphan = failed_delivery(uuid::Uuid::new_v4(), 0, Some(t0()));
    h.insert_delivery(parked.clone());
    h.insert_delivery(orphan.clone());

    let report = h.sweeper().execute_at(t0() + minutes(1)).await.unwrap();

    assert_eq!(report.due, 2);
    assert_eq!(report.skipped, 2);
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.delivery(parked.id), parked);
    assert_eq!(h.delivery(orphan.id), orphan);
}

#[tokio::test]
async fn should_process_each_due_delivery_independently() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    let first = failed_delivery(endpoint.id, 0, Some(t0() - minutes(3)));
    let second = failed_delivery(endpoint.id, 2, Some(t0() - minutes(2)));
    let third = failed_delivery(endpoint.id, 1, Some(t0() - minutes(1)));
    for delivery in [&third, &first, &second] {
        h.insert_delivery(delivery.clone());
    }
    // Oldest next_retry_at first: first fails, second fails terminally, third succeeds.
    h.transport.push(rejected_result(503));
    h.transport.push(rejected_result(500));
    h.transport.push(ok_result());

    let report = h.sweeper().execute_at(t0()).await.unwrap();

    assert_eq!(
        report,
        RetrySweepReport {
            due: 3,
            skipped: 0,
            succeeded: 1,
            rescheduled: 1,
            exhausted: 1,
            errored: 0,
        }
    );
    assert_eq!(h.delivery(first.id).retry_count, 1);
    assert_eq!(h.delivery(first.id).next_retry_at, Some(t0() + minutes(5)));
    assert_eq!(h.delivery(second.id).retry_count, 3);
    assert_eq!(h.delivery(second.id).next_retry_at, None);
    assert_eq!(h.delivery(third.id).status, DeliveryStatus::Success);
}

#[tokio::test]
async fn should_count_errors_without_failing_the_sweep() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));
    h.insert_delivery(failed_delivery(endpoint.id, 0, Some(t0())));
    h.store.lock().unwrap().fail_delivery_writes = true;

    let report = h.sweeper().execute_at(t0()).await.unwrap();

    assert_eq!(report.due, 1);
    assert_eq!(report.errored, 1);
}

#[tokio::test]
async fn should_respect_sweep_batch_size() {
    let endpoint = test_endpoint();
    let mut h = Harness::with_endpoint(endpoint.clone(), MockTransport::ok());
    h.policy.sweep_batch_size = 2;
    for n in 0..5 {
        h.insert_delivery(failed_delivery(endpoint.id, 0, Some(t0() - minutes(n))));
    }

    let report = h.sweeper().execute_at(t0()).await.unwrap();

    assert_eq!(report.due, 2);
    assert_eq!(report.succeeded, 2);
}

#[tokio::test]
async fn should_send_due_delivery_once_when_sweeps_overlap() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));
    let delivery = failed_delivery(endpoint.id, 0, Some(t0()));
    h.insert_delivery(delivery.clone());

    let sweeper_a = h.sweeper();
    let sweeper_b = h.sweeper();
    let (first, second) = tokio::join!(
        sweeper_a.execute_at(t0()),
        sweeper_b.execute_at(t0())
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(h.transport.sent().len(), 1);
    assert_eq!(first.rescheduled + second.rescheduled, 1);
    assert_eq!(first.errored + second.errored, 0);
    let updated = h.delivery(delivery.id);
    assert_eq!(updated.status, DeliveryStatus::Failed);
    assert_eq!(updated.retry_count, 1);
    assert_eq!(updated.next_retry_at, Some(t0() + minutes(5)));
}

#[tokio::test]
async fn should_recover_delivery_left_pending_by_aborted_dispatch() {
    let endpoint = test_endpoint();
    let h = Harness::with_endpoint(endpoint.clone(), MockTransport::failing(500));
    h.store.lock().unwrap().fail_outcome_writes = true;

    let outcome = h
        .dispatcher()
        .execute_at(
            DispatchInput {
                event_id: test_event().id,
                notification: confirmed_notification(),
            },
            t0(),
        )
        .await;
    let DispatchOutcome::Aborted {
        delivery_id: Some(delivery_id),
    } = outcome
    else {
        panic!("expected Aborted with a delivery id, got {outcome:?}");
    };
    let stranded = h.delivery(delivery_id);
    assert_eq!(stranded.status, DeliveryStatus::Pending);
    assert_eq!(stranded.next_retry_at, Some(t0() + minutes(5)));

    h.store.lock().unwrap().fail_outcome_writes = false;
    h.transport.set_fallback(ok_result());

    let early = h.sweeper().execute_at(t0() + minutes(4)).await.unwrap();
    assert_eq!(early.due, 0);

    let report = h.sweeper().execute_at(t0() + minutes(5)).await.unwrap();
    assert_eq!(report.succeeded, 1);
    let recovered = h.delivery(delivery_id);
    assert_eq!(recovered.status, DeliveryStatus::Success);
    assert_eq!(recovered.next_retry_at, None);
    assert_eq!(h.transport.sent().len(), 2);
    assert_eq!(h.transport.sent()[1].body, stranded.payload);
}
