//! Provides clients and utilities for interacting with external APIs.
//!
//! Includes:
//! - `nagios`: Client for the nagios-api JSON HTTP interface.

mod nagios;

pub use nagios::*;
