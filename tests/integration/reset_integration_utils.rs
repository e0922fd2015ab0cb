//! Integration Test Utilities for the Counter Reset
//!
//! Provides integration test utilities including:
//! - A SQLite-backed store on a temporary database file
//! - A fully wired reset handler over any store

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use driver_bookings_reset::config::Config;
use driver_bookings_reset::services::{
    CounterResetService, DailyResetTaskHandler, MockTimeProvider, TimeProvider,
};
use driver_bookings_reset::store::{BookingStore, SqlBookingStore};

/// Integration test context with a real SQLite database
pub struct SqlResetTestContext {
    /// Temporary database directory, removed on drop
    #[allow(dead_code)]
    temp_dir: TempDir,

    pub config: Config,

    pub store: SqlBookingStore,
}

impl SqlResetTestContext {
    /// Create a migrated, empty database with the given batch limit
    pub async fn new(batch_limit: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("driver-bookings.db");

        let config = Config {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            batch_limit,
            ..Config::default()
        };

        let store = SqlBookingStore::connect(&config.store_options()).await?;
        store.migrate().await?;

        Ok(Self {
            temp_dir,
            config,
            store,
        })
    }

    /// Store handle as the job sees it
    pub fn booking_store(&self) -> Arc<dyn BookingStore> {
        Arc::new(self.store.clone())
    }
}

/// Clock fixed at 20:00 Asia/Colombo on 2025-01-07
pub fn trigger_clock() -> Arc<dyn TimeProvider> {
    Arc::new(MockTimeProvider::new_from_ymd_hms(2025, 1, 7, 14, 30, 0).unwrap())
}

/// Handler wired the way the binary wires it
pub fn reset_handler(
    store: Arc<dyn BookingStore>,
    batch_limit: usize,
    timeout: Duration,
) -> Arc<DailyResetTaskHandler> {
    let time_provider = trigger_clock();
    let service = Arc::new(CounterResetService::new(
        store,
        Arc::clone(&time_provider),
        batch_limit,
    ));
    Arc::new(DailyResetTaskHandler::new(
        service,
        time_provider,
        chrono_tz::Asia::Colombo,
        timeout,
    ))
}
