//! Shared helpers for integration tests.
//!
//! - `fixtures`: fixture loaders and response-body factories
//! - `logger`: per-test structured logging

pub mod fixtures;
pub mod logger;
