//! Daily Reset Task Handler
//!
//! Implements the TaskHandler trait for the booking counter reset. This
//! handler is registered with the SchedulingService and executed according
//! to the daily schedule. It owns the logging policy for a run: the reset
//! service returns a typed result and this handler turns it into log output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{ResetError, ResetResult};
use crate::logging;
use crate::models::ResetSummary;
use crate::services::reset_service::CounterResetService;
use crate::services::scheduling_service::{SchedulingError, TaskContext, TaskHandler};
use crate::services::time_provider::TimeProvider;

/// Task identifier the reset job is scheduled under
pub const DAILY_RESET_TASK_ID: &str = "reset-daily-booking-counts";

/// Outcome of the most recent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { records_updated: usize },
    Failed { error_code: &'static str, message: String },
}

/// Running totals for the handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRunStats {
    pub run_count: u64,
    pub failure_count: u64,
    pub last_run_utc: Option<DateTime<Utc>>,
    pub last_outcome: Option<RunOutcome>,
}

impl TaskRunStats {
    fn mark_success(&mut self, at: DateTime<Utc>, summary: &ResetSummary) {
        self.run_count += 1;
        self.last_run_utc = Some(at);
        self.last_outcome = Some(RunOutcome::Succeeded {
            records_updated: summary.records_updated,
        });
    }

    fn mark_failure(&mut self, at: DateTime<Utc>, error: &ResetError) {
        self.run_count += 1;
        self.failure_count += 1;
        self.last_run_utc = Some(at);
        self.last_outcome = Some(RunOutcome::Failed {
            error_code: error.error_code(),
            message: error.to_string(),
        });
    }
}

/// Task handler for the daily booking counter reset
pub struct DailyResetTaskHandler {
    reset_service: Arc<CounterResetService>,
    time_provider: Arc<dyn TimeProvider>,
    timezone: Tz,
    timeout: Duration,
    stats: RwLock<TaskRunStats>,
}

impl DailyResetTaskHandler {
    /// Create a new daily reset task handler
    ///
    /// # Arguments
    /// * `reset_service` - Service performing the reset
    /// * `time_provider` - Clock for failure timestamps
    /// * `timezone` - Timezone the success log line reports local time in
    /// * `timeout` - Longest a single run may take
    pub fn new(
        reset_service: Arc<CounterResetService>,
        time_provider: Arc<dyn TimeProvider>,
        timezone: Tz,
        timeout: Duration,
    ) -> Self {
        Self {
            reset_service,
            time_provider,
            timezone,
            timeout,
            stats: RwLock::new(TaskRunStats::default()),
        }
    }

    pub async fn stats(&self) -> TaskRunStats {
        self.stats.read().await.clone()
    }

    /// Run one reset, bounded by the timeout, and log the outcome
    ///
    /// An abandoned run may already have committed some chunks; the next
    /// run resets everything again.
    pub async fn run_once(&self) -> ResetResult<ResetSummary> {
        info!(
            "Resetting daily booking counts on {}",
            self.reset_service.collection()
        );

        let result = tokio::time::timeout(self.timeout, self.reset_service.reset_all_counters())
            .await
            .unwrap_or(Err(ResetError::TimedOut(self.timeout)));

        let now = self.time_provider.now_utc();
        let mut stats = self.stats.write().await;
        match &result {
            Ok(summary) => {
                logging::log_reset_completed(summary, self.timezone);
                stats.mark_success(now, summary);
            }
            Err(error) => {
                logging::log_reset_failed(error, now);
                stats.mark_failure(now, error);
            }
        }

        result
    }
}

#[async_trait]
impl TaskHandler for DailyResetTaskHandler {
    fn name(&self) -> &str {
        "daily booking counter reset"
    }

    async fn execute(&self, context: &TaskContext) -> Result<(), SchedulingError> {
        info!(
            "Executing daily reset task {} at {}",
            context.task_id,
            context.actual_start_time.to_rfc3339()
        );

        self.run_once()
            .await
            .map(|_| ())
            .map_err(|e| SchedulingError::TaskExecutionFailed {
                message: format!("Daily booking reset failed: {e}"),
            })
    }
}
