//! Unit Tests for the Counter Reset Service
//!
//! Tests the core reset functionality including:
//! - Completeness and idempotence
//! - Empty collections
//! - Chunking across the batch limit
//! - Failure isolation between chunks
//! - Fields other than the counters staying untouched

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use driver_bookings_reset::error::{ResetError, StoreError};
use driver_bookings_reset::models::{DriverBookingRecord, RecordRef, ResetBatch};
use driver_bookings_reset::services::{CounterResetService, TimeProvider};
use driver_bookings_reset::store::memory::Document;
use driver_bookings_reset::store::{BookingStore, InMemoryBookingStore};

use super::reset_test_utils::{assertions, ResetTestContext};

#[tokio::test]
async fn test_every_record_is_reset() {
    let context = ResetTestContext::new();
    context.seed(25).await;

    let summary = context.service(500).reset_all_counters().await.unwrap();

    assert_eq!(summary.records_updated, 25);
    assertions::assert_all_reset(&context.store).await;
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let context = ResetTestContext::new();
    context.seed(10).await;
    let service = context.service(4);

    let first = service.reset_all_counters().await.unwrap();
    let after_first = context.store.records().await;

    let second = service.reset_all_counters().await.unwrap();
    let after_second = context.store.records().await;

    assert_eq!(after_first, after_second);
    assert_eq!(first.records_updated, second.records_updated);
    // Already-zero counters still count as updated
    assert_eq!(second.records_updated, 10);
}

#[tokio::test]
async fn test_empty_collection_succeeds() {
    let context = ResetTestContext::new();

    let summary = context.service(500).reset_all_counters().await.unwrap();

    assert_eq!(summary.records_updated, 0);
    assert_eq!(summary.chunks_committed, 0);
    assert_eq!(context.store.commit_attempts(), 0);
}

#[tokio::test]
async fn test_large_collection_is_chunked() {
    let context = ResetTestContext::with_store_limit(400);
    context.seed(1200).await;

    let summary = context.service(400).reset_all_counters().await.unwrap();

    assert_eq!(summary.chunks_committed, 3);
    assert_eq!(context.store.commit_count(), 3);
    assert_eq!(summary.records_updated, 1200);
    assert_eq!(assertions::count_not_reset(&context.store).await, 0);
}

#[tokio::test]
async fn test_uneven_collection_uses_minimum_chunks() {
    let context = ResetTestContext::with_store_limit(400);
    context.seed(801).await;

    let summary = context.service(400).reset_all_counters().await.unwrap();

    assert_eq!(summary.chunks_committed, 3);
    assertions::assert_all_reset(&context.store).await;
}

#[tokio::test]
async fn test_failed_chunk_keeps_earlier_chunks_committed() {
    let context = ResetTestContext::with_store_limit(400);
    context.seed(1200).await;
    context
        .store
        .fail_commit_attempt(3, StoreError::unavailable("deadline exceeded"))
        .await;

    let result = context.service(400).reset_all_counters().await;

    match result {
        Err(ResetError::PartialBatchFailure {
            committed_chunks,
            total_chunks,
            records_updated,
            source,
        }) => {
            assert_eq!(committed_chunks, 2);
            assert_eq!(total_chunks, 3);
            assert_eq!(records_updated, 800);
            assert_eq!(source, StoreError::unavailable("deadline exceeded"));
        }
        other => panic!("expected a partial batch failure, got {other:?}"),
    }

    // No rollback: the first two chunks stay reset, the last one does not
    assert_eq!(assertions::count_not_reset(&context.store).await, 400);
    assert_eq!(context.store.commit_count(), 2);

    // Re-running the whole job finishes the work
    context.service(400).reset_all_counters().await.unwrap();
    assertions::assert_all_reset(&context.store).await;
}

#[tokio::test]
async fn test_enumeration_failure_writes_nothing() {
    let context = ResetTestContext::new();
    context.seed(5).await;
    context
        .store
        .fail_next_listing(StoreError::unavailable("connection reset"))
        .await;

    let result = context.service(500).reset_all_counters().await;

    assert!(matches!(result, Err(ResetError::TransientStore(_))));
    assert_eq!(context.store.commit_attempts(), 0);
    assert_eq!(assertions::count_not_reset(&context.store).await, 5);
}

#[tokio::test]
async fn test_other_fields_are_untouched() {
    let context = ResetTestContext::new();
    context
        .store
        .insert_record(&DriverBookingRecord::new("driver-x", 5, 6), Some("X"))
        .await;

    let mut document = Document::new();
    document.insert("bookings_for_morning".to_string(), json!(2));
    document.insert("bookings_for_evening".to_string(), json!(9));
    document.insert("vehicle".to_string(), json!({ "plate": "WP-1234", "seats": 4 }));
    context.store.insert_document("driver-y", document).await;

    context.service(500).reset_all_counters().await.unwrap();

    let x = context.store.document("driver-x").await.unwrap();
    assert_eq!(x["driver_name"], Value::from("X"));
    assert_eq!(x.len(), 3);

    let y = context.store.document("driver-y").await.unwrap();
    assert_eq!(y["vehicle"], json!({ "plate": "WP-1234", "seats": 4 }));
    assert_eq!(y["bookings_for_morning"], json!(0));
    assert_eq!(y["bookings_for_evening"], json!(0));
}

#[tokio::test]
async fn test_record_without_counters_gets_them() {
    let context = ResetTestContext::new();
    let mut document = Document::new();
    document.insert("driver_name".to_string(), json!("Nimal"));
    context.store.insert_document("driver-new", document).await;

    context.service(500).reset_all_counters().await.unwrap();

    let record = context.store.record("driver-new").await.unwrap();
    assert!(record.is_reset());
    let document = context.store.document("driver-new").await.unwrap();
    assert_eq!(document["bookings_for_morning"], json!(0));
}

/// Store that loses a record between enumeration and the first commit
struct DeletingStore {
    inner: Arc<InMemoryBookingStore>,
    deleted_id: &'static str,
}

#[async_trait]
impl BookingStore for DeletingStore {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }

    async fn list_record_refs(&self) -> Result<Vec<RecordRef>, StoreError> {
        let refs = self.inner.list_record_refs().await?;
        self.inner.remove(self.deleted_id).await;
        Ok(refs)
    }

    async fn commit_reset(&self, batch: &ResetBatch) -> Result<u64, StoreError> {
        self.inner.commit_reset(batch).await
    }
}

#[tokio::test]
async fn test_record_deleted_after_enumeration_is_not_an_error() {
    let context = ResetTestContext::with_store_limit(4);
    context.seed(10).await;
    let store = DeletingStore {
        inner: context.store.clone(),
        deleted_id: "driver-0005",
    };
    let time_provider: Arc<dyn TimeProvider> = context.time_provider.clone();
    let service = CounterResetService::new(Arc::new(store), time_provider, 4);

    let summary = service.reset_all_counters().await.unwrap();

    // Staged records are counted, including the one that disappeared
    assert_eq!(summary.records_updated, 10);
    assert_eq!(summary.chunks_committed, 3);
    assert!(context.store.record("driver-0005").await.is_none());
    assert_eq!(context.store.len().await, 9);
    assertions::assert_all_reset(&context.store).await;
}
