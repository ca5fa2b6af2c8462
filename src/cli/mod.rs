//! Command-line interface for newsacquire.

mod commands;
mod helpers;
pub mod progress;

pub use commands::{is_verbose, run};
