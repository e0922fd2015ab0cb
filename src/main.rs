//! Driver bookings reset service
//!
//! Connects to the bookings database and resets the daily booking counters
//! on schedule, or once when `BOOKINGS_RESET_RUN_ONCE=true`.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use driver_bookings_reset::config::Config;
use driver_bookings_reset::logging;
use driver_bookings_reset::services::{
    CounterResetService, DailyResetTaskHandler, SchedulingService, SystemTimeProvider,
    TimeProvider, DAILY_RESET_TASK_ID,
};
use driver_bookings_reset::store::{BookingStore, SqlBookingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    logging::init_logging(&config);
    logging::log_startup(&config);
    config.log_config();

    let schedule = config.daily_schedule()?;

    // Store handle is created once and shared by every run
    let store = SqlBookingStore::connect(&config.store_options())
        .await
        .context("Failed to connect to the bookings database")?;
    store.test_connection().await?;
    if config.is_development() {
        store.migrate().await?;
    }

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());
    let reset_service = Arc::new(CounterResetService::new(
        Arc::new(store.clone()) as Arc<dyn BookingStore>,
        Arc::clone(&time_provider),
        config.batch_limit,
    ));
    let handler = Arc::new(DailyResetTaskHandler::new(
        reset_service,
        Arc::clone(&time_provider),
        schedule.timezone(),
        config.job_timeout(),
    ));

    let scheduling_service = SchedulingService::new(Arc::clone(&time_provider));

    if config.run_once {
        let result = scheduling_service
            .execute_now(DAILY_RESET_TASK_ID, handler.as_ref())
            .await;
        store.close().await;
        // Non-zero exit lets an external scheduler see and retry a failed run
        return result.context("Daily booking reset failed");
    }

    scheduling_service.start().await?;
    scheduling_service
        .schedule_daily(DAILY_RESET_TASK_ID, &schedule, handler)
        .await?;

    match scheduling_service.next_run_time(&schedule) {
        Some(next_run) => info!(
            "Next reset {} at {} ({})",
            schedule,
            next_run.to_rfc3339(),
            next_run.with_timezone(&schedule.timezone()).format("%Y-%m-%d %H:%M %Z")
        ),
        None => warn!("Could not compute the next run of {}", schedule),
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    scheduling_service.stop().await?;
    store.close().await;

    Ok(())
}
