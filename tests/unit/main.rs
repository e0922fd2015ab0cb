//! Unit Tests
//!
//! Reset service and schedule behaviour against the in-memory store.

mod reset_service_tests;
mod reset_test_utils;
