//! agent-meter - per-agent AI cost and context-window monitor
//!
//! Collects usage from local agent session logs, a remote metering server or
//! vendor billing APIs, aggregates it into daily/weekly/monthly costs, tracks
//! per-session context fill and raises a one-shot daily budget alert.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod providers;
pub mod render;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, MeterError, Result};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
