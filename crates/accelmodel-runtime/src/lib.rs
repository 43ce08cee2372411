#![warn(missing_docs)]

//! accelmodel runtime crate: global configuration, logging and the registry holding the
//! operations submitted for analysis.

/// Configuration module.
pub mod config;

mod registry;

pub use registry::*;
