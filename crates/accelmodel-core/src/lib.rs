#![warn(missing_docs)]

//! Core types of accelmodel: element types, matrix operations, sharding configurations
//! and the error taxonomy shared by every other crate.

#[macro_use]
extern crate derive_new;

mod elem;
mod error;
mod id;
mod operation;
mod sharding;

pub use elem::*;
pub use error::*;
pub use id::*;
pub use operation::*;
pub use sharding::*;
