mod common;

use common::{t0, vehicle, Harness, DRIVER};
use duty_journey::dto::sync_dto::{JourneyEventRecord, JourneyEventType, JourneyRecord};
use duty_journey::models::{DutyStatus, Evaluation, JourneyAggregate, PauseKind};
use duty_journey::dto::sync_dto::FinalizePayload;
use duty_journey::services::{
    CommandOutcome, Delivery, JourneySession, PendingFinalize, ReconciliationPolicy,
    RestoreSource, StartJourneyCommand,
};
use duty_journey::utils::{AppError, RemoteError};

fn start_command(odometer: &str) -> StartJourneyCommand {
    StartJourneyCommand {
        odometer: odometer.to_string(),
        location: "Depot Lyon".to_string(),
        vehicle: None,
    }
}

async fn ready_to_start(session: &JourneySession) {
    assert_eq!(
        session.select_vehicle(vehicle()).await.unwrap(),
        CommandOutcome::Applied
    );
    assert_eq!(session.start_inspection().await.unwrap(), CommandOutcome::Applied);
    session.evaluate_item("tires", Evaluation::Passed).await.unwrap();
    assert_eq!(
        session.complete_inspection(false).await.unwrap(),
        CommandOutcome::Applied
    );
}

async fn on_journey(harness: &Harness, session: &JourneySession) {
    ready_to_start(session).await;
    harness.clock.set(t0());
    assert_eq!(
        session.start_journey(start_command("1200")).await.unwrap(),
        CommandOutcome::Applied
    );
}

#[tokio::test]
async fn test_rest_break_scenario() {
    let mut harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;

    harness.clock.set(t0() + chrono::Duration::seconds(3600));
    session.pause_journey(PauseKind::Rest).await.unwrap();
    harness.clock.set(t0() + chrono::Duration::seconds(4500));
    session.resume_journey().await.unwrap();
    harness.clock.set(t0() + chrono::Duration::seconds(6300));
    session.start_checkout().await.unwrap();

    let aggregate = session.aggregate().await;
    let accumulated = aggregate.accumulated();
    assert_eq!(aggregate.status, DutyStatus::Checkout);
    assert_eq!(accumulated.drive, 5400);
    assert_eq!(accumulated.rest, 900);
    assert_eq!(accumulated.meal, 0);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.total_elapsed, 6300);
    assert_eq!(
        snapshot.drive_seconds + snapshot.rest_seconds + snapshot.meal_seconds,
        snapshot.total_elapsed
    );

    let deliveries = harness.worker.run_until_idle().await;
    assert_eq!(deliveries, vec![Delivery::Delivered, Delivery::Delivered]);
    assert_eq!(harness.remote.event_types(), vec!["start_rest", "end_rest"]);
}

#[tokio::test]
async fn test_checkout_dwell_time_is_uncounted() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;

    harness.clock.advance_secs(1000);
    session.start_checkout().await.unwrap();
    harness.clock.advance_secs(300);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.total_elapsed, 1300);
    assert_eq!(
        snapshot.drive_seconds + snapshot.rest_seconds + snapshot.meal_seconds,
        1000
    );
}

#[tokio::test]
async fn test_getters_are_pure() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    harness.clock.advance_secs(42);

    let before = session.aggregate().await;
    let first = session.snapshot().await;
    let second = session.snapshot().await;

    assert_eq!(first, second);
    assert_eq!(session.aggregate().await, before);
}

#[tokio::test]
async fn test_resume_while_driving_is_ignored() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    harness.clock.advance_secs(100);

    let before = session.aggregate().await;
    assert_eq!(session.resume_journey().await.unwrap(), CommandOutcome::Ignored);

    let after = session.aggregate().await;
    assert_eq!(after.accumulated(), before.accumulated());
    assert_eq!(after.time.current_segment_start, before.time.current_segment_start);
}

#[tokio::test]
async fn test_concurrent_start_issues_one_remote_call() {
    let harness = Harness::new();
    let session = harness.session();
    ready_to_start(&session).await;

    let (first, second) = tokio::join!(
        session.start_journey(start_command("1200")),
        session.start_journey(start_command("1200"))
    );

    let results = [first, second];
    let applied = results
        .iter()
        .filter(|result| matches!(result, Ok(CommandOutcome::Applied)))
        .count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(AppError::StartInFlight(_))))
        .count();

    assert_eq!(applied, 1);
    assert_eq!(rejected, 1);
    assert_eq!(harness.remote.start_count(), 1);
    assert_eq!(session.aggregate().await.journey_id.as_deref(), Some("J-1"));
}

#[tokio::test]
async fn test_failed_start_can_be_retried() {
    let harness = Harness::new();
    let session = harness.session();
    ready_to_start(&session).await;

    harness
        .remote
        .fail_starts(Some(RemoteError::Unavailable("connection refused".into())));
    let result = session.start_journey(start_command("1200")).await;
    assert!(matches!(result, Err(AppError::Remote(RemoteError::Unavailable(_)))));

    let aggregate = session.aggregate().await;
    assert_eq!(aggregate.status, DutyStatus::ReadyToStart);
    assert!(aggregate.journey_id.is_none());

    harness.remote.fail_starts(None);
    assert_eq!(
        session.start_journey(start_command("1200")).await.unwrap(),
        CommandOutcome::Applied
    );
    assert_eq!(session.aggregate().await.journey_id.as_deref(), Some("J-2"));
}

#[tokio::test]
async fn test_cancel_during_remote_start_is_not_overwritten() {
    let harness = Harness::new();
    let session = harness.session();
    ready_to_start(&session).await;

    let (started, cancelled) = tokio::join!(
        session.start_journey(start_command("1200")),
        session.cancel_journey()
    );

    assert_eq!(cancelled.unwrap(), CommandOutcome::Applied);
    assert!(matches!(started, Err(AppError::StateChanged(_))));
    assert_eq!(session.aggregate().await, JourneyAggregate::default());
    assert!(harness.store.load(DRIVER).await.is_none());
}

#[tokio::test]
async fn test_validation_errors_do_not_touch_remote() {
    let harness = Harness::new();
    let session = harness.session();
    ready_to_start(&session).await;
    let before = session.aggregate().await;

    for odometer in ["", "abc", "-5"] {
        let result = session.start_journey(start_command(odometer)).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "odometer {:?}", odometer);
    }

    let nameless = JourneySession::new("  ", harness.deps.clone());
    ready_to_start(&nameless).await;
    assert!(matches!(
        nameless.start_journey(start_command("1200")).await,
        Err(AppError::Validation(_))
    ));
    assert_eq!(nameless.aggregate().await.status, DutyStatus::ReadyToStart);

    assert_eq!(session.aggregate().await, before);
    assert_eq!(harness.remote.start_count(), 0);
}

#[tokio::test]
async fn test_checklist_is_forwarded_on_start() {
    let harness = Harness::new();
    let session = harness.session();
    session.select_vehicle(vehicle()).await.unwrap();
    session.start_inspection().await.unwrap();
    session
        .evaluate_item("tires", Evaluation::Failed { note: "worn tread".into() })
        .await
        .unwrap();
    session.evaluate_item("lights", Evaluation::Passed).await.unwrap();
    session.complete_inspection(false).await.unwrap();
    // El checklist sigue abierto tras completar la inspección
    session
        .evaluate_item("brakes", Evaluation::Failed { note: "soft pedal".into() })
        .await
        .unwrap();

    session.start_journey(start_command("1200")).await.unwrap();

    let calls = harness.remote.start_calls.lock().unwrap().clone();
    let payload = &calls[0];
    assert_eq!(payload.driver_id, DRIVER);
    assert_eq!(payload.vehicle_id, "veh-1");
    assert_eq!(payload.start_location, "Depot Lyon");
    assert_eq!(payload.start_odometer, "1200");
    assert_eq!(payload.checklist.items.get("tires"), Some(&false));
    assert_eq!(payload.checklist.items.get("lights"), Some(&true));
    assert_eq!(payload.checklist.items.get("brakes"), Some(&false));
    assert_eq!(payload.checklist.notes, "tires: worn tread; brakes: soft pedal");
    assert!(!payload.checklist.has_problems);
    assert_eq!(payload.checklist.rejected_items, vec!["tires", "brakes"]);
}

#[tokio::test]
async fn test_cancel_clears_everything_without_remote_call() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    harness.clock.advance_secs(60);
    session.pause_journey(PauseKind::Meal).await.unwrap();

    let finalized_before = harness.remote.finalized.lock().unwrap().len();
    assert_eq!(session.cancel_journey().await.unwrap(), CommandOutcome::Applied);

    let aggregate = session.aggregate().await;
    assert!(!aggregate.active);
    assert_eq!(aggregate.status, DutyStatus::Inactive);
    assert_eq!(aggregate, JourneyAggregate::default());
    assert!(harness.store.load(DRIVER).await.is_none());
    assert_eq!(harness.remote.finalized.lock().unwrap().len(), finalized_before);
    assert_eq!(harness.remote.start_count(), 1);
}

#[tokio::test]
async fn test_restart_recovers_stored_journey() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    harness.clock.advance_secs(900);
    session.pause_journey(PauseKind::Rest).await.unwrap();
    let before = session.aggregate().await;

    let restarted = harness.session();
    assert_eq!(restarted.restore().await, RestoreSource::Store);

    let after = restarted.aggregate().await;
    assert_eq!(after.status, before.status);
    assert_eq!(after.accumulated(), before.accumulated());
    assert_eq!(after.checklist, before.checklist);
    assert_eq!(after.vehicle, before.vehicle);
    assert_eq!(after.journey_id, before.journey_id);
}

#[tokio::test]
async fn test_unreadable_store_starts_fresh() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;

    harness.cache.set_failing(true);
    let restarted = harness.session();
    assert_eq!(restarted.restore().await, RestoreSource::Fresh);
    assert_eq!(restarted.aggregate().await, JourneyAggregate::default());
}

#[tokio::test]
async fn test_dropped_event_does_not_affect_local_time() {
    let mut harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;

    harness
        .remote
        .fail_events(Some(RemoteError::Unavailable("timeout".into())));
    harness.clock.advance_secs(1800);
    assert_eq!(
        session.pause_journey(PauseKind::Meal).await.unwrap(),
        CommandOutcome::Applied
    );

    assert_eq!(harness.worker.run_until_idle().await, vec![Delivery::Dropped]);
    let aggregate = session.aggregate().await;
    assert_eq!(aggregate.status, DutyStatus::Meal);
    assert_eq!(aggregate.accumulated().drive, 1800);
}

#[tokio::test]
async fn test_checkout_from_meal_closes_the_pause() {
    let mut harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;

    harness.clock.advance_secs(600);
    session.pause_journey(PauseKind::Meal).await.unwrap();
    harness.clock.advance_secs(1200);
    session.start_checkout().await.unwrap();

    harness.worker.run_until_idle().await;
    assert_eq!(harness.remote.event_types(), vec!["start_meal", "end_meal"]);
    assert_eq!(session.aggregate().await.accumulated().meal, 1200);
}

#[tokio::test]
async fn test_end_journey_finalizes_and_resets() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    session.update_location("Client 42").await.unwrap();
    harness.clock.advance_secs(3600);
    session.start_checkout().await.unwrap();

    assert_eq!(
        session.end_journey("1310", "scratch on door").await.unwrap(),
        CommandOutcome::Applied
    );

    let finalized = harness.remote.finalized.lock().unwrap().clone();
    assert_eq!(finalized.len(), 1);
    let (journey_id, payload) = &finalized[0];
    assert_eq!(journey_id, "J-1");
    assert_eq!(payload.end_odometer, "1310");
    assert_eq!(payload.end_location, "Client 42");
    assert_eq!(payload.checklist.notes, "scratch on door");

    assert_eq!(session.aggregate().await, JourneyAggregate::default());
    assert!(harness.store.load(DRIVER).await.is_none());
}

#[tokio::test]
async fn test_failed_finalize_is_retried_after_restart() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    session.start_checkout().await.unwrap();

    harness
        .remote
        .fail_finalize(Some(RemoteError::Unavailable("502 gateway".into())));
    let outcome = session.end_journey("1250", "").await.unwrap();
    assert!(matches!(outcome, CommandOutcome::FinalizeQueued { .. }));
    assert_eq!(session.aggregate().await.status, DutyStatus::Inactive);

    let pending = harness.store.load_pending_finalizations(DRIVER).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].journey_id, "J-1");
    assert_eq!(pending[0].payload.end_odometer, "1250");

    // Sigue caído: el intento se contabiliza
    assert_eq!(session.retry_pending_finalizations().await, 1);
    assert_eq!(harness.store.load_pending_finalizations(DRIVER).await[0].attempts, 2);

    harness.remote.fail_finalize(None);
    let restarted = harness.session();
    assert_eq!(restarted.restore().await, RestoreSource::Fresh);

    assert!(harness.store.load_pending_finalizations(DRIVER).await.is_empty());
    let finalized = harness.remote.finalized.lock().unwrap().clone();
    assert_eq!(finalized.len(), 1);
    assert_eq!(finalized[0].0, "J-1");
}

#[tokio::test]
async fn test_concurrent_end_issues_one_finalize() {
    let harness = Harness::new();
    let session = harness.session();
    on_journey(&harness, &session).await;
    session.start_checkout().await.unwrap();

    let (first, second) = tokio::join!(
        session.end_journey("1250", ""),
        session.end_journey("1250", "")
    );

    let results = [first, second];
    let applied = results
        .iter()
        .filter(|result| matches!(result, Ok(CommandOutcome::Applied)))
        .count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(AppError::EndInFlight(_))))
        .count();

    assert_eq!(applied, 1);
    assert_eq!(rejected, 1);
    assert_eq!(harness.remote.finalize_count(), 1);
    assert_eq!(session.aggregate().await, JourneyAggregate::default());
}

#[tokio::test]
async fn test_finalize_queued_during_retry_sweep_is_kept() {
    let harness = Harness::new();
    let session = harness.session();
    harness
        .store
        .enqueue_pending_finalize(
            DRIVER,
            PendingFinalize {
                journey_id: "J-OLD".into(),
                payload: FinalizePayload {
                    end_location: "Depot Lyon".into(),
                    end_odometer: "900".into(),
                    checklist: Default::default(),
                },
                attempts: 1,
                queued_at: t0(),
                last_error: Some("timeout".into()),
            },
        )
        .await
        .unwrap();

    on_journey(&harness, &session).await;
    session.start_checkout().await.unwrap();
    harness
        .remote
        .fail_finalize(Some(RemoteError::Unavailable("502 gateway".into())));
    harness.remote.hold_finalize("J-OLD");

    // El barrido queda retenido en J-OLD mientras termina la jornada J-1
    let (remaining, ended) = tokio::join!(session.retry_pending_finalizations(), async {
        harness.remote.finalize_entered.notified().await;
        let outcome = session.end_journey("1250", "").await;
        harness.remote.release_finalize();
        outcome
    });

    assert!(matches!(ended.unwrap(), CommandOutcome::FinalizeQueued { .. }));
    assert_eq!(remaining, 2);

    let pending = harness.store.load_pending_finalizations(DRIVER).await;
    let ids: Vec<&str> = pending.iter().map(|entry| entry.journey_id.as_str()).collect();
    assert_eq!(ids, vec!["J-OLD", "J-1"]);
    assert_eq!(pending[0].attempts, 2);
}

fn remote_record() -> JourneyRecord {
    JourneyRecord {
        journey_id: "J-500".into(),
        driver_id: DRIVER.into(),
        vehicle: Some(vehicle()),
        start_location: "Depot Lyon".into(),
        start_odometer: "8000".into(),
        started_at: t0(),
        checklist: None,
        events: vec![
            JourneyEventRecord {
                event_type: JourneyEventType::StartRest,
                occurred_at: t0() + chrono::Duration::seconds(3600),
            },
            JourneyEventRecord {
                event_type: JourneyEventType::EndRest,
                occurred_at: t0() + chrono::Duration::seconds(4500),
            },
        ],
    }
}

#[tokio::test]
async fn test_reconciliation_adopts_remote_journey() {
    let harness = Harness::new();
    *harness.remote.active_journey.lock().unwrap() = Some(remote_record());
    harness.clock.set(t0() + chrono::Duration::seconds(5000));

    let session = harness.session();
    assert_eq!(session.restore().await, RestoreSource::Remote);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, DutyStatus::OnJourney);
    assert_eq!(snapshot.journey_id.as_deref(), Some("J-500"));
    assert_eq!(snapshot.rest_seconds, 900);
    assert_eq!(snapshot.drive_seconds, 4100);
    assert_eq!(snapshot.total_elapsed, 5000);

    // La jornada adoptada queda persistida
    let stored = harness.store.load(DRIVER).await.unwrap();
    assert_eq!(stored.journey_id.as_deref(), Some("J-500"));
}

#[tokio::test]
async fn test_local_wins_keeps_session_inactive() {
    let harness = Harness::with_policy(ReconciliationPolicy::LocalWins);
    *harness.remote.active_journey.lock().unwrap() = Some(remote_record());

    let session = harness.session();
    assert_eq!(session.restore().await, RestoreSource::Fresh);
    assert_eq!(session.aggregate().await, JourneyAggregate::default());
    assert!(harness.store.load(DRIVER).await.is_none());
}

#[tokio::test]
async fn test_probe_failure_starts_inactive() {
    let harness = Harness::new();
    *harness.remote.probe_error.lock().unwrap() =
        Some(RemoteError::Unavailable("dns".into()));

    let session = harness.session();
    assert_eq!(session.restore().await, RestoreSource::Fresh);
    assert_eq!(session.aggregate().await.status, DutyStatus::Inactive);
}

#[tokio::test]
async fn test_restore_runs_once() {
    let harness = Harness::new();
    let session = harness.session();
    assert_eq!(session.restore().await, RestoreSource::Fresh);

    // Una jornada remota que aparece después no pisa la sesión ya restaurada
    *harness.remote.active_journey.lock().unwrap() = Some(remote_record());
    assert_eq!(session.restore().await, RestoreSource::Fresh);
    assert_eq!(session.aggregate().await.status, DutyStatus::Inactive);
}
