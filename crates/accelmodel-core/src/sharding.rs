use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, AnalysisResult};

/// Dimension of a 2D operand.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShardDim {
    /// First dimension.
    #[display("rows")]
    #[serde(rename = "rows")]
    Rows,
    /// Second dimension.
    #[display("cols")]
    #[serde(rename = "cols")]
    Cols,
}

/// How an operation is split across devices.
///
/// `num_devices` should be a power of two for the logarithmic collective step count to be
/// exact, other counts use a fractional number of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardingConfig {
    /// Number of devices the operation is split across.
    pub num_devices: u32,
    /// Sharded dimension of the lhs, if any.
    pub lhs_dim: Option<ShardDim>,
    /// Sharded dimension of the rhs, if any.
    pub rhs_dim: Option<ShardDim>,
}

impl ShardingConfig {
    /// A configuration over `num_devices` with no sharded dimension yet.
    pub fn new(num_devices: u32) -> Self {
        Self {
            num_devices,
            lhs_dim: None,
            rhs_dim: None,
        }
    }

    /// Shard the lhs along `dim`.
    pub fn with_lhs(mut self, dim: ShardDim) -> Self {
        self.lhs_dim = Some(dim);
        self
    }

    /// Shard the rhs along `dim`.
    pub fn with_rhs(mut self, dim: ShardDim) -> Self {
        self.rhs_dim = Some(dim);
        self
    }

    /// Whether the contraction axis is split, meaning partial outputs must be all-reduced.
    pub fn requires_reduction(&self) -> bool {
        self.lhs_dim == Some(ShardDim::Cols) || self.rhs_dim == Some(ShardDim::Rows)
    }

    /// Number of steps of a tree/ring collective over all devices, `log2(num_devices)`.
    pub fn collective_steps(&self) -> f64 {
        (self.num_devices as f64).log2()
    }

    /// Fails when the configuration can't be applied.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.num_devices == 0 {
            return Err(AnalysisError::InvalidSharding {
                reason: "the number of devices must be positive".to_string(),
            });
        }

        if self.lhs_dim.is_none() && self.rhs_dim.is_none() {
            log::warn!(
                "Sharding over {} devices without a sharded dimension replicates the operation",
                self.num_devices
            );
        }

        Ok(())
    }
}
