//! Job lifecycle and supervision tests: guarded transitions through the
//! worker callback path, reconciliation of lapsed leases, and health
//! reporting over a live stack.

mod common;

use std::sync::Arc;

use common::{body_stream, multipart_upload, DeadQueue, FakeMailProvider, TestHarness};
use deckhand::config::DispatchConfig;
use deckhand::db::job_repo::{self, JobStatus, Transition};
use deckhand::db::{lease_expiry, now_rfc3339};
use deckhand::health::{self, ComponentHealth};
use deckhand::objectstore::LocalObjectStore;
use deckhand::queue::DispatchQueue;
use deckhand::reconcile::{reconcile, ReconcileReport, LEASE_EXPIRED_ERROR};
use deckhand::retry::RetryPolicy;

const LAPSED: &str = "2020-01-01T00:00:00Z";

async fn ingest_one(harness: &TestHarness) -> (deckhand::db::deck_repo::DeckRow, job_repo::JobRow) {
    let service = harness.service();
    let (content_type, body) = multipart_upload(None, "deck.pdf", b"%PDF-1.4");
    service
        .ingest_upload(&content_type, body_stream(body))
        .await
        .expect("ingest failed")
}

#[tokio::test]
async fn test_job_runs_to_completion() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    // Worker picks the job up.
    assert!(job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900))
        .unwrap()
        .applied());
    let running = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert!(running.started_at.is_some());

    // Worker reports its results.
    assert!(job_repo::mark_completed(
        &harness.db,
        &job.id,
        Some(r#"{"claims":["arr doubled"]}"#),
        Some(r#"{"verified":true}"#),
        Some("# Analysis report"),
    )
    .unwrap()
    .applied());

    let done = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.claims.as_deref(), Some(r#"{"claims":["arr doubled"]}"#));
    assert_eq!(done.verification.as_deref(), Some(r#"{"verified":true}"#));
    assert_eq!(done.report.as_deref(), Some("# Analysis report"));
    assert!(done.error.is_none());

    let started = done.started_at.unwrap();
    let completed = done.completed_at.unwrap();
    assert!(started <= completed);
}

#[tokio::test]
async fn test_mark_failed_records_error_and_leaves_results_null() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    assert!(job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900))
        .unwrap()
        .applied());
    assert!(job_repo::mark_failed(&harness.db, &job.id, "parser timeout")
        .unwrap()
        .applied());

    let failed = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("parser timeout"));
    assert!(failed.completed_at.is_some());
    assert!(failed.claims.is_none());
    assert!(failed.report.is_none());
}

#[tokio::test]
async fn test_terminal_status_never_regresses() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    assert!(job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900))
        .unwrap()
        .applied());
    assert!(
        job_repo::mark_completed(&harness.db, &job.id, Some("{}"), None, Some("report"))
            .unwrap()
            .applied()
    );

    // Every further transition is refused.
    assert_eq!(
        job_repo::mark_failed(&harness.db, &job.id, "late failure").unwrap(),
        Transition::NotApplied
    );
    assert_eq!(
        job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900)).unwrap(),
        Transition::NotApplied
    );
    assert_eq!(
        job_repo::mark_completed(&harness.db, &job.id, None, None, None).unwrap(),
        Transition::NotApplied
    );

    let stored = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.claims.as_deref(), Some("{}"));
    assert_eq!(stored.report.as_deref(), Some("report"));
    assert!(stored.error.is_none());
}

#[tokio::test]
async fn test_double_start_keeps_first_stamp() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    assert!(job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900))
        .unwrap()
        .applied());
    let first = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();

    // A redelivered message tries to start the job again.
    assert_eq!(
        job_repo::mark_started(&harness.db, &job.id, &lease_expiry(3600)).unwrap(),
        Transition::NotApplied
    );

    let second = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(second.started_at, first.started_at);
    assert_eq!(second.lease_expires_at, first.lease_expires_at);
}

#[tokio::test]
async fn test_reconcile_requeues_job_lost_before_dispatch() {
    let harness = TestHarness::new();
    let dispatch = DispatchConfig {
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
        },
        ..DispatchConfig::default()
    };
    let service = harness.service_with(Arc::new(DeadQueue), &dispatch);

    // Dispatch fails outright; the pair is still recorded.
    let (content_type, body) = multipart_upload(None, "deck.pdf", b"%PDF-1.4");
    let (deck, job) = service
        .ingest_upload(&content_type, body_stream(body))
        .await
        .unwrap();
    assert_eq!(harness.queue.length().await.unwrap(), 0);

    // Once the lease lapses, the sweep re-dispatches onto a live queue.
    job_repo::extend_lease(&harness.db, &job.id, LAPSED).unwrap();
    let report = reconcile(&harness.db, &harness.queue, &now_rfc3339(), 900)
        .await
        .unwrap();
    assert_eq!(report, ReconcileReport { requeued: 1, failed: 0 });

    let messages = harness.queue.pull(10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].job_id, job.id);
    assert_eq!(messages[0].deck_path, deck.staging_path);

    let stored = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert!(stored.lease_expires_at.unwrap() > now_rfc3339());
}

#[tokio::test]
async fn test_reconcile_fails_job_whose_worker_vanished() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    // Worker takes the message and starts, then crashes.
    let taken = harness.queue.pull(1).await.unwrap();
    assert_eq!(taken.len(), 1);
    assert!(job_repo::mark_started(&harness.db, &job.id, &lease_expiry(900))
        .unwrap()
        .applied());
    job_repo::extend_lease(&harness.db, &job.id, LAPSED).unwrap();

    let report = reconcile(&harness.db, &harness.queue, &now_rfc3339(), 900)
        .await
        .unwrap();
    assert_eq!(report, ReconcileReport { requeued: 0, failed: 1 });

    let stored = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some(LEASE_EXPIRED_ERROR));
    assert!(stored.completed_at.is_some());

    // The sweep settled it; running again changes nothing.
    let again = reconcile(&harness.db, &harness.queue, &now_rfc3339(), 900)
        .await
        .unwrap();
    assert_eq!(again, ReconcileReport::default());
}

#[tokio::test]
async fn test_late_worker_callback_after_reconcile_is_refused() {
    let harness = TestHarness::new();
    let (_deck, job) = ingest_one(&harness).await;

    assert!(job_repo::mark_started(&harness.db, &job.id, LAPSED)
        .unwrap()
        .applied());
    reconcile(&harness.db, &harness.queue, &now_rfc3339(), 900)
        .await
        .unwrap();

    // The worker was only slow, not dead, and reports in afterwards.
    assert_eq!(
        job_repo::mark_completed(&harness.db, &job.id, Some("{}"), None, None).unwrap(),
        Transition::NotApplied
    );
    let stored = job_repo::find_by_id(&harness.db, &job.id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_health_reports_live_and_missing_components() {
    let harness = TestHarness::new();
    let provider = FakeMailProvider::new();
    let store = LocalObjectStore::new(harness.temp_path().join("objects"));

    let report = health::check(&harness.db, &harness.queue, Some(&provider), Some(&store)).await;
    assert!(report.database.is_connected());
    assert!(report.queue.is_connected());
    assert!(report.mail.is_connected());
    assert!(report.object_store.is_connected());
    assert!(!report.degraded());

    let bare = health::check(&harness.db, &harness.queue, None, None).await;
    assert_eq!(bare.mail, ComponentHealth::NotConfigured);
    assert_eq!(bare.object_store, ComponentHealth::NotConfigured);
    assert!(!bare.degraded());

    let json = serde_json::to_value(&bare).unwrap();
    assert_eq!(json["database"], "connected");
    assert_eq!(json["mail"], "not configured");
}
