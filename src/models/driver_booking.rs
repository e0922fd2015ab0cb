//! Driver Booking Model
//!
//! Records in the driver bookings collection, and the types a reset run uses
//! to stage and report its writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Field holding the morning booking counter
pub const MORNING_COUNTER_FIELD: &str = "bookings_for_morning";

/// Field holding the evening booking counter
pub const EVENING_COUNTER_FIELD: &str = "bookings_for_evening";

/// A driver's daily booking counters
///
/// Other fields may live on the same record; they are owned by other writers
/// and are never read or written here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DriverBookingRecord {
    /// Identifier assigned by the backing store
    pub id: String,

    /// Bookings taken for the morning slot
    pub bookings_for_morning: i64,

    /// Bookings taken for the evening slot
    pub bookings_for_evening: i64,
}

impl DriverBookingRecord {
    pub fn new(id: impl Into<String>, bookings_for_morning: i64, bookings_for_evening: i64) -> Self {
        Self {
            id: id.into(),
            bookings_for_morning,
            bookings_for_evening,
        }
    }

    /// Both counters are zero
    pub fn is_reset(&self) -> bool {
        self.bookings_for_morning == 0 && self.bookings_for_evening == 0
    }
}

/// Reference to a record, as returned by enumerating the collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Counter resets staged for a single bulk commit
///
/// A batch never holds more references than its capacity, so every commit
/// stays within the store's per-batch write limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetBatch {
    capacity: usize,
    refs: Vec<RecordRef>,
}

impl ResetBatch {
    /// Create an empty batch holding at most `capacity` writes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            refs: Vec::with_capacity(capacity),
        }
    }

    /// Stage a counter reset for `record`
    ///
    /// Returns the reference back when the batch is full.
    pub fn stage(&mut self, record: RecordRef) -> Result<(), RecordRef> {
        if self.is_full() {
            return Err(record);
        }
        self.refs.push(record);
        Ok(())
    }

    /// Split `refs` into the minimum number of batches of at most `capacity` writes
    pub fn chunked(refs: &[RecordRef], capacity: usize) -> Vec<ResetBatch> {
        if capacity == 0 {
            return Vec::new();
        }

        refs.chunks(capacity)
            .map(|chunk| ResetBatch {
                capacity,
                refs: chunk.to_vec(),
            })
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.refs.iter().map(|record| record.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.refs.len() >= self.capacity
    }
}

/// Outcome of a successful reset run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetSummary {
    /// Identifier of this run, for correlating log lines
    pub run_id: Uuid,

    /// Records whose counters were set to zero (already-zero records included)
    pub records_updated: usize,

    /// Bulk operations committed
    pub chunks_committed: usize,

    /// When enumeration started
    pub started_at: DateTime<Utc>,

    /// When the last chunk was committed
    pub completed_at: DateTime<Utc>,
}

impl ResetSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}
