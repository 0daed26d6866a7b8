//! Defines the data structures and models used throughout the application.
//!
//! This covers the monitoring snapshot returned by nagios-api (`/state`) in its typed form.

mod nagios;

pub use nagios::*;
