/// Analysis config module.
pub mod analysis;
/// Session config module.
pub mod session;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
