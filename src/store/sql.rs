//! SQL booking store
//!
//! Keeps the driver bookings collection in a SQL table through SQLx's `Any`
//! driver, so the same code runs against SQLite and PostgreSQL. Each reset
//! batch is applied as one `UPDATE ... WHERE id IN (...)` inside its own
//! transaction.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use sqlx::any::AnyPoolOptions;
use sqlx::{query, AnyPool};
use tracing::{debug, info, instrument, warn, Instrument};

use super::types::DatabaseType;
use super::BookingStore;
use crate::error::StoreError;
use crate::logging;
use crate::models::{DriverBookingRecord, RecordRef, ResetBatch};

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex is valid"))
}

/// Whether `name` can be used verbatim as a table name
pub fn is_valid_collection_name(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Connection settings for [`SqlBookingStore::connect`]
#[derive(Debug, Clone)]
pub struct SqlStoreOptions {
    pub database_url: String,
    pub collection: String,
    pub max_connections: u32,
    pub max_batch_size: usize,
    pub acquire_timeout: Duration,
}

/// Booking store backed by a SQL table
#[derive(Debug, Clone)]
pub struct SqlBookingStore {
    pool: AnyPool,
    database_type: DatabaseType,
    collection: String,
    max_batch_size: usize,
}

impl SqlBookingStore {
    /// Connect to the database named by `options.database_url`
    pub async fn connect(options: &SqlStoreOptions) -> Result<Self, StoreError> {
        if !is_valid_collection_name(&options.collection) {
            return Err(StoreError::Backend(format!(
                "Invalid collection name: {}",
                options.collection
            )));
        }

        sqlx::any::install_default_drivers();
        let database_type = DatabaseType::from_url(&options.database_url);

        info!("Connecting to {} database", database_type);

        // Each connection to an in-memory SQLite database sees its own database
        let max_connections = if options.database_url.contains(":memory:") {
            1
        } else {
            options.max_connections
        };

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(&options.database_url)
            .await?;

        debug!("Successfully connected to {} database", database_type);

        // One bind parameter per record in the reset statement
        let max_batch_size = options
            .max_batch_size
            .min(database_type.max_bind_parameters());
        if max_batch_size < options.max_batch_size {
            warn!(
                "Batch size {} exceeds the {} bind parameter limit, using {}",
                options.max_batch_size, database_type, max_batch_size
            );
        }

        Ok(Self {
            pool,
            database_type,
            collection: options.collection.clone(),
            max_batch_size,
        })
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    /// Create the collection table if it does not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!(
            "Running migrations for {} on {}",
            self.collection, self.database_type
        );

        let counter_type = self.database_type.counter_column_type();
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                driver_name TEXT,
                bookings_for_morning {counter_type} NOT NULL DEFAULT 0 CHECK (bookings_for_morning >= 0),
                bookings_for_evening {counter_type} NOT NULL DEFAULT 0 CHECK (bookings_for_evening >= 0)
            )
            "#,
            table = self.collection,
        );
        query(&sql)
            .execute(&self.pool)
            .instrument(crate::db_span!("migrate", self.collection))
            .await?;

        debug!("Table {} ready", self.collection);
        Ok(())
    }

    /// Test database connection
    pub async fn test_connection(&self) -> Result<(), StoreError> {
        query("SELECT 1").fetch_one(&self.pool).await?;
        debug!("Database connection test successful");
        Ok(())
    }

    /// Insert a record or overwrite its counters and driver name
    pub async fn upsert_record(
        &self,
        record: &DriverBookingRecord,
        driver_name: Option<&str>,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {table} (id, driver_name, bookings_for_morning, bookings_for_evening) \
             VALUES ({values}) \
             ON CONFLICT (id) DO UPDATE SET driver_name = excluded.driver_name, \
             bookings_for_morning = excluded.bookings_for_morning, \
             bookings_for_evening = excluded.bookings_for_evening",
            table = self.collection,
            values = self.database_type.placeholders(1, 4),
        );

        query(&sql)
            .bind(record.id.clone())
            .bind(driver_name.map(str::to_string))
            .bind(record.bookings_for_morning)
            .bind(record.bookings_for_evening)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn fetch_record(&self, id: &str) -> Result<Option<DriverBookingRecord>, StoreError> {
        let sql = format!(
            "SELECT id, bookings_for_morning, bookings_for_evening FROM {table} WHERE id = {param}",
            table = self.collection,
            param = self.database_type.placeholder(1),
        );

        let record = sqlx::query_as::<_, DriverBookingRecord>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn fetch_driver_name(&self, id: &str) -> Result<Option<String>, StoreError> {
        let sql = format!(
            "SELECT driver_name FROM {table} WHERE id = {param}",
            table = self.collection,
            param = self.database_type.placeholder(1),
        );

        let name = sqlx::query_scalar::<_, Option<String>>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(name.flatten())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl BookingStore for SqlBookingStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn list_record_refs(&self) -> Result<Vec<RecordRef>, StoreError> {
        let started = Instant::now();
        let sql = format!("SELECT id FROM {} ORDER BY id", self.collection);

        let ids = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await?;

        logging::log_store_operation(
            "list",
            &self.collection,
            elapsed_ms(started),
            Some(ids.len() as u64),
        );
        Ok(ids.into_iter().map(RecordRef::new).collect())
    }

    #[instrument(skip(self, batch), fields(collection = %self.collection, batch_size = batch.len()))]
    async fn commit_reset(&self, batch: &ResetBatch) -> Result<u64, StoreError> {
        if batch.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let sql = format!(
            "UPDATE {table} SET bookings_for_morning = 0, bookings_for_evening = 0 WHERE id IN ({ids})",
            table = self.collection,
            ids = self.database_type.placeholders(1, batch.len()),
        );

        let mut tx = self.pool.begin().await?;
        let mut update = query(&sql);
        for id in batch.ids() {
            update = update.bind(id.to_string());
        }
        let result = update.execute(&mut *tx).await?;
        tx.commit().await?;

        logging::log_store_operation(
            "commit_reset",
            &self.collection,
            elapsed_ms(started),
            Some(result.rows_affected()),
        );
        Ok(result.rows_affected())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
