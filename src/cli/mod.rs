//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes the argument grammar (`args`), dispatch of a parsed command line against
//! nagios-api (`commands`), and text rendering of hosts and services (`output`).

mod args;
mod commands;
mod output;

pub use args::*;
pub use commands::*;
