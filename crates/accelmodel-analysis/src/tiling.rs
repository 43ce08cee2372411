use accelmodel_core::MatmulDims;
use serde::{Deserialize, Serialize};

use crate::TilingUnit;

/// Fraction of the padded tiles along one axis that does useful work.
///
/// `1.0` when `dim` is a multiple of `unit`, `dim / (ceil(dim / unit) * unit)` otherwise.
pub fn tile_utilization(dim: usize, unit: usize) -> f64 {
    if dim.is_multiple_of(unit) {
        return 1.0;
    }

    dim as f64 / (dim.div_ceil(unit) as f64 * unit as f64)
}

/// Utilization of one axis of the compute array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisUtilization {
    /// Problem size along the axis.
    pub dim: usize,
    /// Tile edge along the axis.
    pub unit: usize,
    /// Useful fraction of the padded work.
    pub value: f64,
}

impl AxisUtilization {
    /// Utilization of `dim` tiled by `unit`.
    pub fn new(dim: usize, unit: usize) -> Self {
        Self {
            dim,
            unit,
            value: tile_utilization(dim, unit),
        }
    }

    /// Size of the axis once padded to whole tiles.
    pub fn padded(&self) -> usize {
        self.dim.div_ceil(self.unit) * self.unit
    }
}

/// Tiling utilization of a matmul on every axis of the compute array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilingUtilization {
    /// lhs rows (`B`) against the `m` edge.
    pub lhs: AxisUtilization,
    /// Contraction (`D`) against the `k` edge.
    pub contraction: AxisUtilization,
    /// rhs columns (`F`) against the `n` edge.
    pub rhs: AxisUtilization,
}

impl TilingUtilization {
    /// Utilization of `dims` tiled by `unit`.
    pub fn new(dims: MatmulDims, unit: TilingUnit) -> Self {
        Self {
            lhs: AxisUtilization::new(dims.b, unit.m),
            contraction: AxisUtilization::new(dims.d, unit.k),
            rhs: AxisUtilization::new(dims.f, unit.n),
        }
    }

    /// Every axis with its name.
    pub fn axes(&self) -> [(&'static str, AxisUtilization); 3] {
        [
            ("batch", self.lhs),
            ("contraction", self.contraction),
            ("output", self.rhs),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiples_are_fully_utilized() {
        assert_eq!(tile_utilization(256, 128), 1.0);
        assert_eq!(tile_utilization(128, 128), 1.0);
        assert_eq!(tile_utilization(48, 16), 1.0);
    }

    #[test]
    fn remainders_waste_padding() {
        assert_eq!(tile_utilization(100, 128), 0.78125);
        assert_eq!(tile_utilization(129, 128), 129.0 / 256.0);
        assert_eq!(tile_utilization(1, 8), 0.125);
    }

    #[test]
    fn utilization_per_axis() {
        let dims = MatmulDims {
            b: 100,
            d: 256,
            f: 200,
        };
        let utilization = TilingUtilization::new(dims, TilingUnit::new(128, 128, 128));

        assert_eq!(utilization.lhs.value, 0.78125);
        assert_eq!(utilization.lhs.padded(), 128);
        assert_eq!(utilization.contraction.value, 1.0);
        assert_eq!(utilization.rhs.value, 200.0 / 256.0);
    }
}
