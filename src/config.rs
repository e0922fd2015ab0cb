//! Configuration management for the driver bookings reset job
//!
//! Handles environment variables and application settings.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::schedule::{DailySchedule, ScheduleError};
use crate::store::sql::{is_valid_collection_name, SqlStoreOptions};

/// Prefix shared by every environment variable this job reads
pub const ENV_PREFIX: &str = "BOOKINGS_RESET_";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database URL
    pub database_url: String,

    /// Collection (table) holding the driver booking records
    pub collection: String,

    /// Trigger expression, e.g. "every day 20:00"
    pub schedule: String,

    /// IANA timezone the schedule is interpreted in
    pub timezone: String,

    /// Maximum writes per bulk commit
    pub batch_limit: usize,

    /// Seconds a single run may take before it is abandoned
    pub job_timeout_secs: u64,

    /// Maximum pooled database connections
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Run one reset immediately and exit instead of waiting for the schedule
    pub run_once: bool,

    /// Environment (development, production)
    pub environment: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:driver-bookings.db?mode=rwc".to_string(),
            collection: "driver_bookings".to_string(),
            schedule: "every day 20:00".to_string(),
            timezone: "Asia/Colombo".to_string(),
            batch_limit: 500,
            job_timeout_secs: 540,
            max_connections: 5,
            acquire_timeout_secs: 30,
            run_once: false,
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, using the same variable names as [`Config::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        // Database configuration
        if let Some(database_url) = var("DATABASE_URL") {
            config.database_url = database_url;
        }

        if let Some(collection) = var("COLLECTION") {
            config.collection = collection;
        }

        if let Some(max_connections) = var("MAX_CONNECTIONS") {
            config.max_connections = max_connections
                .parse()
                .map_err(|_| ConfigError::InvalidMaxConnections(max_connections))?;
        }

        if let Some(timeout) = var("ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidAcquireTimeout(timeout))?;
        }

        // Trigger configuration
        if let Some(schedule) = var("SCHEDULE") {
            config.schedule = schedule;
        }

        if let Some(timezone) = var("TIMEZONE") {
            config.timezone = timezone;
        }

        // Job settings
        if let Some(batch_limit) = var("BATCH_LIMIT") {
            config.batch_limit = batch_limit
                .parse()
                .map_err(|_| ConfigError::InvalidBatchLimit(batch_limit))?;
        }

        if let Some(timeout) = var("JOB_TIMEOUT_SECS") {
            config.job_timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidJobTimeout(timeout))?;
        }

        if let Some(run_once) = var("RUN_ONCE") {
            config.run_once = run_once
                .parse()
                .map_err(|_| ConfigError::InvalidBool(run_once))?;
        }

        // Environment
        if let Some(environment) = var("ENVIRONMENT") {
            config.environment = environment;
        }

        // Logging
        if let Some(log_level) = var("LOG_LEVEL") {
            config.log_level = log_level;
        }

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        if !is_valid_collection_name(&self.collection) {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        if self.batch_limit == 0 {
            return Err(ConfigError::InvalidBatchLimit(self.batch_limit.to_string()));
        }

        if self.job_timeout_secs == 0 {
            return Err(ConfigError::InvalidJobTimeout(self.job_timeout_secs.to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                self.max_connections.to_string(),
            ));
        }

        self.daily_schedule()?;

        Ok(())
    }

    /// The parsed trigger schedule
    pub fn daily_schedule(&self) -> Result<DailySchedule, ConfigError> {
        Ok(DailySchedule::parse(&self.schedule, &self.timezone)?)
    }

    /// The parsed schedule timezone
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        Ok(self.daily_schedule()?.timezone())
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Connection settings for the SQL store
    pub fn store_options(&self) -> SqlStoreOptions {
        SqlStoreOptions {
            database_url: self.database_url.clone(),
            collection: self.collection.clone(),
            max_connections: self.max_connections,
            max_batch_size: self.batch_limit,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Log configuration (excluding sensitive data)
    pub fn log_config(&self) {
        info!("Configuration loaded:");
        info!("  Environment: {}", self.environment);
        info!("  Database URL: {}", self.mask_database_url());
        info!("  Collection: {}", self.collection);
        info!("  Schedule: {} ({})", self.schedule, self.timezone);
        info!("  Batch limit: {}", self.batch_limit);
        info!("  Job timeout: {}s", self.job_timeout_secs);
        info!("  Max connections: {}", self.max_connections);
        info!("  Run once: {}", self.run_once);
        info!("  Log level: {}", self.log_level);
    }

    /// Mask database URL for logging
    fn mask_database_url(&self) -> String {
        if self.database_url.starts_with("sqlite:") {
            self.database_url.clone()
        } else if let Some((scheme, _)) = self.database_url.split_once("://") {
            format!("{scheme}://***")
        } else {
            "***".to_string()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid batch limit: {0} (must be a positive integer)")]
    InvalidBatchLimit(String),

    #[error("Invalid job timeout: {0}")]
    InvalidJobTimeout(String),

    #[error("Invalid max connections: {0}")]
    InvalidMaxConnections(String),

    #[error("Invalid acquire timeout: {0}")]
    InvalidAcquireTimeout(String),

    #[error("Invalid boolean value: {0}")]
    InvalidBool(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Empty database URL")]
    EmptyDatabaseUrl,

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}
