//! Logging configuration for the driver bookings reset job
//!
//! Structured logging setup with appropriate levels and formatting, plus the
//! log lines a reset run emits. Failure lines carry the error code, chunk
//! counts and timestamp.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::Config;
use crate::error::ResetError;
use crate::models::ResetSummary;

/// Default filter directives for a given log level
fn default_filter(log_level: &str) -> String {
    format!("driver_bookings_reset={log_level},sqlx=warn,tokio_cron_scheduler=warn")
}

/// Initialize the application logging system
///
/// `RUST_LOG` takes precedence over the configured level. Production gets
/// JSON lines, everything else a compact console format.
pub fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.is_production() {
        registry.with(json_layer()).try_init()
    } else {
        registry.with(console_layer()).try_init()
    };

    if result.is_ok() {
        tracing::info!("Logging system initialized");
    }
}

/// JSON logging layer for production
fn json_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
}

/// Console logging layer for development
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true)
}

/// Create a span for a single reset run
#[macro_export]
macro_rules! reset_span {
    ($run_id:expr, $collection:expr) => {
        tracing::info_span!(
            "counter_reset",
            run_id = %$run_id,
            collection = %$collection,
            records = tracing::field::Empty,
            chunks = tracing::field::Empty,
        )
    };
}

/// Create a span for database operations
#[macro_export]
macro_rules! db_span {
    ($operation:expr, $table:expr) => {
        tracing::debug_span!(
            "database_operation",
            operation = %$operation,
            table = %$table,
            duration_ms = tracing::field::Empty,
            rows_affected = tracing::field::Empty,
        )
    };
}

/// Log application startup
pub fn log_startup(config: &Config) {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        schedule = %config.schedule,
        timezone = %config.timezone,
        "Driver bookings reset starting up"
    );
}

/// Log a successful reset run
pub fn log_reset_completed(summary: &ResetSummary, timezone: Tz) {
    let local_time = summary.completed_at.with_timezone(&timezone);
    tracing::info!(
        run_id = %summary.run_id,
        records_updated = summary.records_updated,
        chunks_committed = summary.chunks_committed,
        duration_ms = summary.duration().num_milliseconds(),
        local_time = %local_time.format("%Y-%m-%d %H:%M:%S %Z"),
        "Successfully reset booking counts for {} drivers at {}",
        summary.records_updated,
        summary.completed_at.to_rfc3339(),
    );
}

/// Log a failed reset run
pub fn log_reset_failed(error: &ResetError, failed_at: DateTime<Utc>) {
    let (committed_chunks, total_chunks, records_updated) = match error {
        ResetError::PartialBatchFailure {
            committed_chunks,
            total_chunks,
            records_updated,
            ..
        } => (Some(*committed_chunks), Some(*total_chunks), Some(*records_updated)),
        _ => (None, None, None),
    };

    tracing::error!(
        error = %error,
        error_code = error.error_code(),
        retryable = error.is_retryable(),
        committed_chunks = ?committed_chunks,
        total_chunks = ?total_chunks,
        records_updated = ?records_updated,
        failed_at = %failed_at.to_rfc3339(),
        "Error resetting booking counts"
    );

    if error.requires_operator() {
        tracing::error!(
            error_code = error.error_code(),
            "Store access was refused; check the job's credentials before the next run"
        );
    }
}

/// Log database operation
pub fn log_store_operation(operation: &str, collection: &str, duration_ms: u64, rows: Option<u64>) {
    tracing::debug!(
        operation = %operation,
        collection = %collection,
        duration_ms = duration_ms,
        rows = ?rows,
        "Store operation completed"
    );
}
