use accelmodel_core::{AnalysisError, AnalysisResult, ElemType, MatrixOperation};
use accelmodel_runtime::config::session::ProfileKind;
use serde::{Deserialize, Serialize};

use crate::{FastMemoryAnalysis, SingleDeviceMetrics, TilingUtilization};

/// Peak throughput in FLOP/s for every element type.
///
/// One field per [ElemType], so a profile can't leave a type without a rate.
#[derive(new, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputTable {
    /// 8-bit float rate.
    pub f8: f64,
    /// 16-bit brain float rate.
    pub bf16: f64,
    /// 32-bit float rate.
    pub f32: f64,
    /// 8-bit integer rate.
    pub int8: f64,
    /// 4-bit integer rate.
    pub int4: f64,
}

impl ThroughputTable {
    /// Peak FLOP/s when computing in `elem`.
    pub fn peak_flops(&self, elem: ElemType) -> f64 {
        match elem {
            ElemType::F8 => self.f8,
            ElemType::BF16 => self.bf16,
            ElemType::F32 => self.f32,
            ElemType::I8 => self.int8,
            ElemType::I4 => self.int4,
        }
    }
}

/// Bandwidth (bytes/s) and capacity (bytes) of a memory tier.
#[derive(new, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryTier {
    /// Bytes per second.
    pub bandwidth: f64,
    /// Bytes.
    pub capacity: f64,
}

/// Device-to-device fabric.
#[derive(new, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interconnect {
    /// Bytes per second between devices of the same tightly-coupled domain.
    pub intra_node_bandwidth: f64,
    /// Bytes per second between domains.
    pub inter_node_bandwidth: f64,
    /// Devices in one tightly-coupled domain.
    pub max_devices_per_domain: u32,
}

/// Granularity at which the compute array processes a matmul, `[m, k] x [k, n]`.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilingUnit {
    /// Tile edge along the lhs rows.
    pub m: usize,
    /// Tile edge along the contraction dimension.
    pub k: usize,
    /// Tile edge along the rhs columns.
    pub n: usize,
}

impl core::fmt::Display for TilingUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}x{}", self.m, self.k, self.n)
    }
}

/// Fixed hardware constants of an accelerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpec {
    /// Display name.
    pub name: String,
    /// Hardware family.
    pub kind: ProfileKind,
    /// Peak compute rate per element type.
    pub throughput: ThroughputTable,
    /// Off-chip memory (HBM).
    pub main_memory: MemoryTier,
    /// On-chip memory (scratchpad or cache).
    pub fast_memory: MemoryTier,
    /// Multi-device fabric.
    pub interconnect: Interconnect,
    /// Compute array granularity.
    pub tiling: TilingUnit,
}

impl HardwareSpec {
    /// Checks that every rate, capacity and tile edge is positive.
    pub fn validate(&self) -> AnalysisResult<()> {
        let invalid = |reason: String| {
            Err(AnalysisError::InvalidProfile {
                reason: format!("{}: {reason}", self.name),
            })
        };

        for elem in ElemType::ALL {
            let rate = self.throughput.peak_flops(elem);
            if !(rate.is_finite() && rate > 0.0) {
                return invalid(format!("{elem} throughput must be positive, got {rate}"));
            }
        }

        let rates = [
            ("main memory bandwidth", self.main_memory.bandwidth),
            ("main memory capacity", self.main_memory.capacity),
            ("fast memory bandwidth", self.fast_memory.bandwidth),
            ("fast memory capacity", self.fast_memory.capacity),
            ("intra-node bandwidth", self.interconnect.intra_node_bandwidth),
            ("inter-node bandwidth", self.interconnect.inter_node_bandwidth),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }

        if self.interconnect.max_devices_per_domain == 0 {
            return invalid("devices per domain must be positive".to_string());
        }

        let TilingUnit { m, k, n } = self.tiling;
        if m == 0 || k == 0 || n == 0 {
            return invalid(format!("tiling unit {} has a zero edge", self.tiling));
        }

        Ok(())
    }

    /// Ridge point of the roofline for `elem`: `peak_flops / main memory bandwidth`.
    pub fn balanced_intensity(&self, elem: ElemType) -> f64 {
        self.throughput.peak_flops(elem) / self.main_memory.bandwidth
    }
}

/// Compute and main-memory times of an operation before any fast-memory effect.
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct RooflineTimes {
    /// `flops / peak_flops`
    pub compute_time: f64,
    /// `total_bytes / main memory bandwidth`
    pub memory_time: f64,
}

/// An accelerator that can be modeled.
///
/// Profiles share the same analysis, they only differ in constants and in the few places where
/// the hardware behaves differently: fast memory, collective communication and extra advice.
pub trait AcceleratorProfile: Send + Sync + core::fmt::Debug {
    /// Hardware constants.
    fn spec(&self) -> &HardwareSpec;

    /// Fast-memory residency and its effect on memory time.
    fn fast_memory(&self, operation: &MatrixOperation, times: &RooflineTimes)
    -> FastMemoryAnalysis;

    /// Time to all-reduce `output_bytes` of partial results over `num_devices`.
    fn communication_cost(&self, output_bytes: f64, num_devices: u32) -> f64;

    /// Batch size under which a bf16 matmul can't reach the ridge point.
    fn batch_threshold(&self) -> usize;

    /// Name of the profile.
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Hardware family.
    fn kind(&self) -> ProfileKind {
        self.spec().kind
    }

    /// Fraction of padded-tile work that is useful, per axis.
    fn tiling_utilization(&self, operation: &MatrixOperation) -> TilingUtilization {
        TilingUtilization::new(operation.dims(), self.spec().tiling)
    }

    /// Fraction of the compute units kept busy, when the profile models it.
    fn occupancy(&self, _operation: &MatrixOperation) -> Option<f64> {
        None
    }

    /// Fraction of ideal linear speedup achieved, when the profile reports it.
    fn scaling_efficiency(&self, _speedup: f64, _num_devices: u32) -> Option<f64> {
        None
    }

    /// Profile-specific advice appended after the shared rules.
    fn extra_recommendations(
        &self,
        _operation: &MatrixOperation,
        _metrics: &SingleDeviceMetrics,
        _recommendations: &mut Vec<String>,
    ) {
    }
}

impl<P: AcceleratorProfile + ?Sized> AcceleratorProfile for Box<P> {
    fn spec(&self) -> &HardwareSpec {
        (**self).spec()
    }

    fn fast_memory(
        &self,
        operation: &MatrixOperation,
        times: &RooflineTimes,
    ) -> FastMemoryAnalysis {
        (**self).fast_memory(operation, times)
    }

    fn communication_cost(&self, output_bytes: f64, num_devices: u32) -> f64 {
        (**self).communication_cost(output_bytes, num_devices)
    }

    fn batch_threshold(&self) -> usize {
        (**self).batch_threshold()
    }

    fn tiling_utilization(&self, operation: &MatrixOperation) -> TilingUtilization {
        (**self).tiling_utilization(operation)
    }

    fn occupancy(&self, operation: &MatrixOperation) -> Option<f64> {
        (**self).occupancy(operation)
    }

    fn scaling_efficiency(&self, speedup: f64, num_devices: u32) -> Option<f64> {
        (**self).scaling_efficiency(speedup, num_devices)
    }

    fn extra_recommendations(
        &self,
        operation: &MatrixOperation,
        metrics: &SingleDeviceMetrics,
        recommendations: &mut Vec<String>,
    ) {
        (**self).extra_recommendations(operation, metrics, recommendations)
    }
}

/// The profile modeling `kind`.
pub fn profile_for(kind: ProfileKind) -> Box<dyn AcceleratorProfile> {
    match kind {
        ProfileKind::Tpu => Box::new(crate::TpuProfile::v5e()),
        ProfileKind::Gpu => Box::new(crate::GpuProfile::h100()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpuProfile, TpuProfile};

    #[test]
    fn builtin_profiles_are_valid() {
        TpuProfile::v5e().spec().validate().unwrap();
        GpuProfile::h100().spec().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_constants() {
        let mut spec = TpuProfile::v5e().spec().clone();
        spec.throughput.int4 = 0.0;
        assert!(matches!(
            spec.validate(),
            Err(AnalysisError::InvalidProfile { .. })
        ));

        let mut spec = GpuProfile::h100().spec().clone();
        spec.tiling.k = 0;
        assert!(spec.validate().is_err());

        let mut spec = GpuProfile::h100().spec().clone();
        spec.main_memory.bandwidth = f64::NAN;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn profile_for_kind() {
        assert_eq!(profile_for(ProfileKind::Tpu).kind(), ProfileKind::Tpu);
        assert_eq!(profile_for(ProfileKind::Gpu).kind(), ProfileKind::Gpu);
    }
}
