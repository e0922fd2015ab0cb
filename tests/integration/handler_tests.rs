//! Integration Tests for the Daily Reset Handler
//!
//! Tests the handler as the scheduler drives it:
//! - Successful runs through `execute_now`
//! - Failed runs reported without panicking or retrying
//! - Repeated triggers converging on a fully reset collection

use std::sync::Arc;
use std::time::Duration;

use driver_bookings_reset::error::StoreError;
use driver_bookings_reset::models::DriverBookingRecord;
use driver_bookings_reset::services::{
    SchedulingError, SchedulingService, DAILY_RESET_TASK_ID,
};
use driver_bookings_reset::store::InMemoryBookingStore;

use super::reset_integration_utils::{reset_handler, trigger_clock};

async fn seeded_store(count: usize, max_batch_size: usize) -> Arc<InMemoryBookingStore> {
    let store = Arc::new(InMemoryBookingStore::with_max_batch_size(
        "driver_bookings",
        max_batch_size,
    ));
    for i in 0..count {
        store
            .insert_record(&DriverBookingRecord::new(format!("driver-{i:04}"), 3, 1), None)
            .await;
    }
    store
}

#[tokio::test]
async fn test_manual_trigger_resets_everything() {
    let store = seeded_store(30, 500).await;
    let handler = reset_handler(store.clone(), 500, Duration::from_secs(5));
    let scheduling_service = SchedulingService::new(trigger_clock());

    scheduling_service
        .execute_now(DAILY_RESET_TASK_ID, handler.as_ref())
        .await
        .unwrap();

    assert!(store.records().await.iter().all(DriverBookingRecord::is_reset));
    let stats = handler.stats().await;
    assert_eq!(stats.run_count, 1);
    assert_eq!(stats.failure_count, 0);
}

#[tokio::test]
async fn test_partial_failure_is_reported_not_raised() {
    let store = seeded_store(1200, 400).await;
    store
        .fail_commit_attempt(2, StoreError::unavailable("deadline exceeded"))
        .await;
    let handler = reset_handler(store.clone(), 400, Duration::from_secs(5));
    let scheduling_service = SchedulingService::new(trigger_clock());

    let result = scheduling_service
        .execute_now(DAILY_RESET_TASK_ID, handler.as_ref())
        .await;

    assert!(matches!(
        result,
        Err(SchedulingError::TaskExecutionFailed { .. })
    ));
    // Only the first chunk landed and nothing was retried
    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.commit_attempts(), 2);
    let reset = store.records().await.iter().filter(|r| r.is_reset()).count();
    assert_eq!(reset, 400);

    let stats = handler.stats().await;
    assert_eq!(stats.failure_count, 1);
}

#[tokio::test]
async fn test_next_trigger_completes_interrupted_run() {
    let store = seeded_store(900, 400).await;
    store
        .fail_commit_attempt(3, StoreError::unavailable("connection reset"))
        .await;
    let handler = reset_handler(store.clone(), 400, Duration::from_secs(5));

    assert!(handler.run_once().await.is_err());
    let summary = handler.run_once().await.unwrap();

    assert_eq!(summary.records_updated, 900);
    assert_eq!(summary.chunks_committed, 3);
    assert!(store.records().await.iter().all(DriverBookingRecord::is_reset));

    let stats = handler.stats().await;
    assert_eq!(stats.run_count, 2);
    assert_eq!(stats.failure_count, 1);
}

#[tokio::test]
async fn test_manual_trigger_surfaces_failed_run() {
    let store = seeded_store(5, 500).await;
    store
        .fail_next_listing(StoreError::permission_denied("credentials revoked"))
        .await;
    let handler = reset_handler(store.clone(), 500, Duration::from_secs(5));
    let scheduling_service = SchedulingService::new(trigger_clock());

    // Run-once mode turns this error into a non-zero exit status
    let result = scheduling_service
        .execute_now(DAILY_RESET_TASK_ID, handler.as_ref())
        .await;

    match result {
        Err(SchedulingError::TaskExecutionFailed { message }) => {
            assert!(message.contains("credentials revoked"));
        }
        other => panic!("expected a failed task, got {other:?}"),
    }
    assert_eq!(store.commit_attempts(), 0);
}
