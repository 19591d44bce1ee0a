//! Utility functions.

pub mod env;
pub mod format;
pub mod time;

pub use format::{format_context, format_cost, format_cost_fine, format_percent, format_tokens};
pub use time::{format_relative_time, format_time_left};
