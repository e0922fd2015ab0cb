//! In-memory booking store
//!
//! Holds documents as JSON maps, the way a document database would, so that
//! fields other than the two counters can be checked after a reset. Failures
//! can be scripted per operation for exercising the job's error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{BookingStore, DEFAULT_MAX_BATCH_SIZE};
use crate::error::StoreError;
use crate::models::driver_booking::{EVENING_COUNTER_FIELD, MORNING_COUNTER_FIELD};
use crate::models::{DriverBookingRecord, RecordRef, ResetBatch};

/// A stored document: field name to JSON value
pub type Document = Map<String, Value>;

/// Substitute store for tests and local dry runs
#[derive(Debug)]
pub struct InMemoryBookingStore {
    collection: String,
    max_batch_size: usize,
    documents: RwLock<BTreeMap<String, Document>>,
    list_failure: Mutex<Option<StoreError>>,
    /// Failures keyed by 1-based commit attempt number
    commit_failures: Mutex<HashMap<usize, StoreError>>,
    commit_attempts: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryBookingStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self::with_max_batch_size(collection, DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn with_max_batch_size(collection: impl Into<String>, max_batch_size: usize) -> Self {
        Self {
            collection: collection.into(),
            max_batch_size,
            documents: RwLock::new(BTreeMap::new()),
            list_failure: Mutex::new(None),
            commit_failures: Mutex::new(HashMap::new()),
            commit_attempts: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    /// Insert or replace a raw document
    pub async fn insert_document(&self, id: impl Into<String>, document: Document) {
        self.documents.write().await.insert(id.into(), document);
    }

    /// Insert or replace a record, optionally with a driver name alongside the counters
    pub async fn insert_record(&self, record: &DriverBookingRecord, driver_name: Option<&str>) {
        let mut document = Document::new();
        document.insert(
            MORNING_COUNTER_FIELD.to_string(),
            Value::from(record.bookings_for_morning),
        );
        document.insert(
            EVENING_COUNTER_FIELD.to_string(),
            Value::from(record.bookings_for_evening),
        );
        if let Some(name) = driver_name {
            document.insert("driver_name".to_string(), Value::from(name));
        }
        self.insert_document(record.id.clone(), document).await;
    }

    pub async fn document(&self, id: &str) -> Option<Document> {
        self.documents.read().await.get(id).cloned()
    }

    /// Read the counters of a record; missing counters read as zero
    pub async fn record(&self, id: &str) -> Option<DriverBookingRecord> {
        let documents = self.documents.read().await;
        let document = documents.get(id)?;
        let counter = |field: &str| document.get(field).and_then(Value::as_i64).unwrap_or(0);

        Some(DriverBookingRecord::new(
            id,
            counter(MORNING_COUNTER_FIELD),
            counter(EVENING_COUNTER_FIELD),
        ))
    }

    pub async fn records(&self) -> Vec<DriverBookingRecord> {
        let ids: Vec<String> = self.documents.read().await.keys().cloned().collect();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.record(&id).await {
                records.push(record);
            }
        }
        records
    }

    pub async fn remove(&self, id: &str) -> Option<Document> {
        self.documents.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Make the next enumeration fail with `error`
    pub async fn fail_next_listing(&self, error: StoreError) {
        *self.list_failure.lock().await = Some(error);
    }

    /// Make the `attempt`-th commit (1-based, counted over the store's lifetime) fail with `error`
    pub async fn fail_commit_attempt(&self, attempt: usize, error: StoreError) {
        self.commit_failures.lock().await.insert(attempt, error);
    }

    /// Number of batches successfully committed
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of commits attempted, failed ones included
    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn list_record_refs(&self) -> Result<Vec<RecordRef>, StoreError> {
        if let Some(error) = self.list_failure.lock().await.take() {
            return Err(error);
        }

        Ok(self
            .documents
            .read()
            .await
            .keys()
            .map(|id| RecordRef::new(id.clone()))
            .collect())
    }

    async fn commit_reset(&self, batch: &ResetBatch) -> Result<u64, StoreError> {
        let attempt = self.commit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.commit_failures.lock().await.remove(&attempt) {
            return Err(error);
        }

        if batch.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }

        // Single write lock for the whole batch keeps the commit atomic
        let mut documents = self.documents.write().await;
        let mut touched = 0;
        for id in batch.ids() {
            if let Some(document) = documents.get_mut(id) {
                document.insert(MORNING_COUNTER_FIELD.to_string(), Value::from(0));
                document.insert(EVENING_COUNTER_FIELD.to_string(), Value::from(0));
                touched += 1;
            }
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Committed reset batch of {} on {} ({} touched)",
            batch.len(),
            self.collection,
            touched
        );
        Ok(touched)
    }
}
