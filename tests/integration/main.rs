//! Integration Tests
//!
//! The reset job wired end to end: handler, scheduler and a real SQLite store.

mod handler_tests;
mod reset_integration_utils;
