//! Provides the on-disk status cache.
//!
//! Currently a single JSON file holding the last `/state` snapshot, via the `status` submodule.

mod status;

pub use status::*;
