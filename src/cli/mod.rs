//! Command-line interface.

mod commands;
mod progress;

pub use commands::{run, Cli};
