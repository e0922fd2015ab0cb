//! Models module for the driver bookings reset job
//!
//! Contains the data models and their validation logic.

pub mod driver_booking;
pub mod schedule;

// Re-export commonly used types
pub use driver_booking::{DriverBookingRecord, RecordRef, ResetBatch, ResetSummary};
pub use schedule::{DailySchedule, ScheduleError};
