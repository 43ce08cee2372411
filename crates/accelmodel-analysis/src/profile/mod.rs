mod base;
mod gpu;
mod tpu;

pub use base::*;
pub use gpu::*;
pub use tpu::*;
