//! Test Utilities for Counter Reset Tests
//!
//! Provides common test utilities and fixtures for reset testing:
//! - Mock time provider integration
//! - Seeded in-memory stores
//! - Assertion helpers

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use driver_bookings_reset::models::DriverBookingRecord;
use driver_bookings_reset::services::{CounterResetService, MockTimeProvider, TimeProvider};
use driver_bookings_reset::store::InMemoryBookingStore;

pub const COLLECTION: &str = "driver_bookings";

/// Test context for counter reset tests
pub struct ResetTestContext {
    /// Mock time provider, starting at 20:00 Asia/Colombo on 2025-01-07
    pub time_provider: Arc<MockTimeProvider>,

    /// Substitute store
    pub store: Arc<InMemoryBookingStore>,
}

impl ResetTestContext {
    pub fn new() -> Self {
        Self::with_store_limit(500)
    }

    /// Context whose store refuses batches larger than `max_batch_size`
    pub fn with_store_limit(max_batch_size: usize) -> Self {
        let start_time = Utc.with_ymd_and_hms(2025, 1, 7, 14, 30, 0).single().unwrap();
        Self {
            time_provider: Arc::new(MockTimeProvider::new(start_time)),
            store: Arc::new(InMemoryBookingStore::with_max_batch_size(
                COLLECTION,
                max_batch_size,
            )),
        }
    }

    /// Build a reset service over this context's store
    pub fn service(&self, batch_limit: usize) -> CounterResetService {
        let time_provider: Arc<dyn TimeProvider> = self.time_provider.clone();
        CounterResetService::new(self.store.clone(), time_provider, batch_limit)
    }

    /// Seed `count` records with non-zero counters
    pub async fn seed(&self, count: usize) {
        for record in factories::records(count) {
            self.store.insert_record(&record, None).await;
        }
    }
}

pub mod factories {
    use super::*;

    /// Records with ids `driver-0000`.. and counters that vary per record
    pub fn records(count: usize) -> Vec<DriverBookingRecord> {
        (0..count)
            .map(|i| {
                let i = i as i64;
                DriverBookingRecord::new(format!("driver-{i:04}"), i % 7 + 1, i % 3)
            })
            .collect()
    }
}

pub mod assertions {
    use super::*;

    /// Every record in the store has both counters at zero
    pub async fn assert_all_reset(store: &InMemoryBookingStore) {
        for record in store.records().await {
            assert!(record.is_reset(), "record {} was not reset: {:?}", record.id, record);
        }
    }

    /// Number of records in the store that still carry non-zero counters
    pub async fn count_not_reset(store: &InMemoryBookingStore) -> usize {
        store
            .records()
            .await
            .iter()
            .filter(|record| !record.is_reset())
            .count()
    }
}
