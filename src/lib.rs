//! Driver bookings reset
//!
//! Resets the morning and evening booking counters of every driver once a
//! day, at a fixed wall-clock time in a fixed timezone.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

pub use config::{Config, ConfigError};
pub use error::{ResetError, StoreError};
