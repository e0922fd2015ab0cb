//! Scheduling Service
//!
//! Provides background task scheduling on top of `tokio-cron-scheduler`.
//! Jobs are registered with a [`DailySchedule`] and fire in the schedule's
//! own timezone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::DailySchedule;
use crate::services::time_provider::TimeProvider;

/// Errors that can occur during scheduling operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Job scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Invalid cron expression: {cron_expression}")]
    InvalidCronExpression { cron_expression: String },

    #[error("Task execution failed: {message}")]
    TaskExecutionFailed { message: String },

    #[error("Scheduler not started")]
    SchedulerNotStarted,
}

/// Result type for scheduling operations
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Trait for task execution handlers
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    async fn execute(&self, context: &TaskContext) -> Result<(), SchedulingError>;
}

/// Context provided to task handlers during execution
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Identifier the task was scheduled under
    pub task_id: String,
    /// When the task actually started execution
    pub actual_start_time: DateTime<Utc>,
    /// Whether the run was triggered by the schedule or requested directly
    pub manual: bool,
}

/// Service for managing background task scheduling
pub struct SchedulingService {
    /// The job scheduler instance
    scheduler: Arc<Mutex<Option<JobScheduler>>>,
    /// Time provider for deterministic testing
    time_provider: Arc<dyn TimeProvider>,
}

impl SchedulingService {
    /// Creates a new SchedulingService
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(None)),
            time_provider,
        }
    }

    /// Starts the scheduling service
    pub async fn start(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        *guard = Some(scheduler);
        info!("Scheduling service started");
        Ok(())
    }

    /// Stops the scheduling service
    pub async fn stop(&self) -> SchedulingResult<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(mut scheduler) = guard.take() {
            scheduler.shutdown().await?;
            info!("Scheduling service stopped");
        }
        Ok(())
    }

    /// Checks if the scheduler is currently running
    pub async fn is_running(&self) -> bool {
        self.scheduler.lock().await.is_some()
    }

    /// Schedules `handler` to run every day according to `schedule`
    ///
    /// # Returns
    /// The scheduler's job id, for [`SchedulingService::unschedule`]
    pub async fn schedule_daily(
        &self,
        task_id: &str,
        schedule: &DailySchedule,
        handler: Arc<dyn TaskHandler>,
    ) -> SchedulingResult<Uuid> {
        let guard = self.scheduler.lock().await;
        let scheduler = guard.as_ref().ok_or(SchedulingError::SchedulerNotStarted)?;

        let cron_expression = schedule.cron_expression();
        Self::validate_cron_expression(&cron_expression)?;

        let task_id_for_job = task_id.to_string();
        let time_provider = Arc::clone(&self.time_provider);

        let job = Job::new_async_tz(
            cron_expression.as_str(),
            schedule.timezone(),
            move |_uuid, _lock| {
                let context = TaskContext {
                    task_id: task_id_for_job.clone(),
                    actual_start_time: time_provider.now_utc(),
                    manual: false,
                };
                let handler = Arc::clone(&handler);

                Box::pin(async move {
                    let _ = run_handler(handler.as_ref(), &context).await;
                })
            },
        )?;

        let job_id = scheduler.add(job).await?;
        info!(
            "Scheduled task {} ({}) with cron: {} in {}",
            task_id,
            job_id,
            cron_expression,
            schedule.timezone().name()
        );
        Ok(job_id)
    }

    /// Runs `handler` right away, outside the schedule
    ///
    /// # Returns
    /// The handler's own result, after it has been logged
    pub async fn execute_now(
        &self,
        task_id: &str,
        handler: &dyn TaskHandler,
    ) -> Result<(), SchedulingError> {
        let context = TaskContext {
            task_id: task_id.to_string(),
            actual_start_time: self.time_provider.now_utc(),
            manual: true,
        };
        run_handler(handler, &context).await
    }

    /// Unschedules a job
    pub async fn unschedule(&self, job_id: &Uuid) -> SchedulingResult<()> {
        let guard = self.scheduler.lock().await;
        let scheduler = guard.as_ref().ok_or(SchedulingError::SchedulerNotStarted)?;

        scheduler.remove(job_id).await.map_err(|_| SchedulingError::JobNotFound {
            job_id: job_id.to_string(),
        })?;

        info!("Unscheduled job: {}", job_id);
        Ok(())
    }

    /// Next time `schedule` fires, from the service's clock
    pub fn next_run_time(&self, schedule: &DailySchedule) -> Option<DateTime<Utc>> {
        schedule.next_run_after(self.time_provider.now_utc())
    }

    /// Validates a cron expression
    fn validate_cron_expression(cron_expression: &str) -> SchedulingResult<()> {
        Job::new_async(cron_expression, |_uuid, _lock| Box::pin(async {})).map_err(|_| {
            SchedulingError::InvalidCronExpression {
                cron_expression: cron_expression.to_string(),
            }
        })?;

        Ok(())
    }
}

/// Execute a handler and log its outcome
async fn run_handler(handler: &dyn TaskHandler, context: &TaskContext) -> Result<(), SchedulingError> {
    info!(
        "Running task {} ({}){}",
        context.task_id,
        handler.name(),
        if context.manual { " on request" } else { "" }
    );

    let result = handler.execute(context).await;
    match &result {
        Ok(()) => info!("Task {} executed successfully", context.task_id),
        Err(SchedulingError::TaskExecutionFailed { message }) => {
            warn!("Task {} reported failure: {}", context.task_id, message);
        }
        Err(e) => error!("Task {} execution failed: {}", context.task_id, e),
    }
    result
}
