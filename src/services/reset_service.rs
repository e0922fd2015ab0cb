//! Counter Reset Service
//!
//! Zeroes the morning and evening booking counters on every record of the
//! driver bookings collection.
//!
//! A run enumerates the collection once, splits the references into batches
//! no larger than the effective batch limit, and commits the batches one
//! after another. Each batch is atomic on its own; nothing spans batches, so
//! a failure part-way leaves earlier batches committed. Resetting to zero is
//! idempotent, so the whole run can be repeated.

use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{ResetError, ResetResult};
use crate::models::{ResetBatch, ResetSummary};
use crate::reset_span;
use crate::services::time_provider::TimeProvider;
use crate::store::BookingStore;

/// Resets the daily booking counters of every driver
pub struct CounterResetService {
    store: Arc<dyn BookingStore>,
    time_provider: Arc<dyn TimeProvider>,
    batch_limit: usize,
}

impl CounterResetService {
    /// Create a new counter reset service
    ///
    /// # Arguments
    /// * `store` - The store holding the driver bookings collection
    /// * `time_provider` - Clock used to timestamp runs
    /// * `batch_limit` - Maximum writes per bulk commit; the store's own maximum still applies
    pub fn new(
        store: Arc<dyn BookingStore>,
        time_provider: Arc<dyn TimeProvider>,
        batch_limit: usize,
    ) -> Self {
        Self {
            store,
            time_provider,
            batch_limit,
        }
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }

    /// Batch size actually used: the smaller of the configured limit and the store's maximum
    pub fn effective_batch_limit(&self) -> usize {
        self.batch_limit.min(self.store.max_batch_size())
    }

    /// Reset both booking counters on every record in the collection
    ///
    /// # Returns
    /// `Ok(ResetSummary)` once every enumerated record has been reset,
    /// `Err(ResetError)` otherwise. Batches committed before a failure stay
    /// committed.
    pub async fn reset_all_counters(&self) -> ResetResult<ResetSummary> {
        let run_id = Uuid::new_v4();
        let span = reset_span!(run_id, self.store.collection());
        self.run(run_id).instrument(span).await
    }

    async fn run(&self, run_id: Uuid) -> ResetResult<ResetSummary> {
        let batch_limit = self.effective_batch_limit();
        if batch_limit == 0 {
            return Err(ResetError::InvalidBatchLimit(batch_limit));
        }

        let started_at = self.time_provider.now_utc();
        let refs = self
            .store
            .list_record_refs()
            .await
            .map_err(ResetError::from_store)?;

        let batches = ResetBatch::chunked(&refs, batch_limit);
        let total_chunks = batches.len();
        tracing::Span::current().record("records", refs.len());
        tracing::Span::current().record("chunks", total_chunks);
        info!(
            "Resetting counters on {} records in {} chunks of at most {}",
            refs.len(),
            total_chunks,
            batch_limit
        );

        let mut records_updated = 0;
        for (index, batch) in batches.iter().enumerate() {
            let touched = match self.store.commit_reset(batch).await {
                Ok(touched) => touched,
                Err(error) if index == 0 => return Err(ResetError::from_store(error)),
                Err(error) => {
                    return Err(ResetError::PartialBatchFailure {
                        committed_chunks: index,
                        total_chunks,
                        records_updated,
                        source: error,
                    })
                }
            };

            if touched < batch.len() as u64 {
                warn!(
                    "Chunk {}/{}: {} of {} records no longer exist",
                    index + 1,
                    total_chunks,
                    batch.len() as u64 - touched,
                    batch.len()
                );
            }
            records_updated += batch.len();
            debug!("Committed chunk {}/{}", index + 1, total_chunks);
        }

        Ok(ResetSummary {
            run_id,
            records_updated,
            chunks_committed: total_chunks,
            started_at,
            completed_at: self.time_provider.now_utc(),
        })
    }
}
