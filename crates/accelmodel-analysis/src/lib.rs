#![warn(missing_docs)]

//! Closed-form performance model of a matrix multiplication on an accelerator.
//!
//! The model classifies an operation as compute-bound or memory-bound against the roofline of
//! a [profile](AcceleratorProfile), accounts for tiling-unit padding and fast memory, estimates
//! the collective-communication cost of sharding it across devices, and produces roofline
//! samples plus recommendations for a presentation layer.

#[macro_use]
extern crate derive_new;

mod analyzer;
mod communication;
mod metrics;
mod profile;
mod recommendation;
mod roofline;
mod tiling;

pub use analyzer::*;
pub use communication::*;
pub use metrics::*;
pub use profile::*;
pub use recommendation::*;
pub use roofline::*;
pub use tiling::*;
