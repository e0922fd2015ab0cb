//! Services module for the driver bookings reset job
//!
//! Contains the reset logic and the scheduling around it.

pub mod daily_reset_task_handler;
pub mod reset_service;
pub mod scheduling_service;
pub mod time_provider;

// Re-export commonly used services
pub use daily_reset_task_handler::{DailyResetTaskHandler, TaskRunStats, DAILY_RESET_TASK_ID};
pub use reset_service::CounterResetService;
pub use scheduling_service::{SchedulingError, SchedulingService, TaskContext, TaskHandler};
pub use time_provider::{MockTimeProvider, SystemTimeProvider, TimeProvider};
