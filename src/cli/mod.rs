//! Command-line interface.

pub mod args;
pub mod snapshot;
pub mod watch;

pub use args::{Cli, Commands, OutputFormat};
