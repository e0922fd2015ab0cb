//! Booking store abstraction
//!
//! The reset job needs exactly three things from the backing store: a way to
//! enumerate every record reference in the collection, a way to stage a
//! multi-record counter reset ([`ResetBatch`]), and a way to commit a staged
//! batch atomically.

pub mod memory;
pub mod sql;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{RecordRef, ResetBatch};

pub use memory::InMemoryBookingStore;
pub use sql::{SqlBookingStore, SqlStoreOptions};
pub use types::DatabaseType;

/// Writes per committed batch when the store sets no tighter ceiling
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Backing store holding the driver bookings collection
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Name of the collection this store operates on
    fn collection(&self) -> &str;

    /// Largest batch [`BookingStore::commit_reset`] accepts
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }

    /// Enumerate references to every record currently in the collection
    async fn list_record_refs(&self) -> Result<Vec<RecordRef>, StoreError>;

    /// Set both booking counters to zero on every record in `batch`, all or nothing
    ///
    /// Returns the number of records the store actually touched, which can be
    /// lower than the batch size when records were deleted after enumeration.
    async fn commit_reset(&self, batch: &ResetBatch) -> Result<u64, StoreError>;
}
