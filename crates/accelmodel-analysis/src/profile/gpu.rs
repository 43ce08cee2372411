use accelmodel_core::{AnalysisResult, ElemType, MatrixOperation};
use accelmodel_runtime::config::session::ProfileKind;

use super::{
    AcceleratorProfile, HardwareSpec, Interconnect, MemoryTier, RooflineTimes, ThroughputTable,
    TilingUnit,
};
use crate::{FastMemoryAnalysis, FastMemoryKind, SingleDeviceMetrics, collective_cost};

const MIB: f64 = (1u64 << 20) as f64;

/// Tensor-core accelerator with a hardware-managed L2 cache and a two-tier fabric: a fast
/// switch inside a node and a slower network between nodes.
#[derive(Debug, Clone)]
pub struct GpuProfile {
    spec: HardwareSpec,
    /// Number of streaming multiprocessors.
    pub sm_count: u32,
    /// Output tiles one SM keeps resident at once.
    pub tiles_per_sm: u32,
    /// Edge of the output tiles used to estimate occupancy.
    pub occupancy_tile: usize,
    /// Effective memory-time reduction when the weights stay in L2.
    pub cache_benefit: f64,
}

impl GpuProfile {
    /// A profile from custom constants. Fails when a constant is not positive.
    pub fn new(
        spec: HardwareSpec,
        sm_count: u32,
        tiles_per_sm: u32,
        occupancy_tile: usize,
        cache_benefit: f64,
    ) -> AnalysisResult<Self> {
        spec.validate()?;
        if sm_count == 0
            || tiles_per_sm == 0
            || occupancy_tile == 0
            || !(cache_benefit.is_finite() && cache_benefit > 0.0)
        {
            return Err(accelmodel_core::AnalysisError::InvalidProfile {
                reason: format!("{}: occupancy and cache constants must be positive", spec.name),
            });
        }

        Ok(Self {
            spec,
            sm_count,
            tiles_per_sm,
            occupancy_tile,
            cache_benefit,
        })
    }

    /// H100 SXM: 132 SMs, 80 GB of HBM3, 50 MiB of L2, 8 GPUs per NVLink domain.
    pub fn h100() -> Self {
        Self {
            spec: HardwareSpec {
                name: "H100 SXM".to_string(),
                kind: ProfileKind::Gpu,
                throughput: ThroughputTable::new(1.979e15, 9.89e14, 4.95e14, 1.979e15, 3.958e15),
                main_memory: MemoryTier::new(3.35e12, 80e9),
                fast_memory: MemoryTier::new(1.2e13, 50.0 * MIB),
                interconnect: Interconnect::new(4.5e11, 5.0e10, 8),
                tiling: TilingUnit::new(16, 16, 8),
            },
            sm_count: 132,
            tiles_per_sm: 4,
            occupancy_tile: 32,
            cache_benefit: 1.5,
        }
    }

    /// Tensor cores want dimensions aligned to 16 elements, 32 for 8-bit and narrower types.
    pub fn alignment(elem: ElemType) -> usize {
        match elem.is_narrow() {
            true => 32,
            false => 16,
        }
    }
}

impl AcceleratorProfile for GpuProfile {
    fn spec(&self) -> &HardwareSpec {
        &self.spec
    }

    /// Only the weights (rhs) are checked against L2, activations stream through.
    fn fast_memory(
        &self,
        operation: &MatrixOperation,
        times: &RooflineTimes,
    ) -> FastMemoryAnalysis {
        let resident_bytes = operation.bytes().rhs;
        let capacity = self.spec.fast_memory.capacity;

        if resident_bytes > capacity {
            return FastMemoryAnalysis::miss(
                FastMemoryKind::Cache,
                resident_bytes,
                capacity,
                times.memory_time,
            );
        }

        FastMemoryAnalysis {
            kind: FastMemoryKind::Cache,
            resident_bytes,
            capacity,
            fits: true,
            effective_memory_time: times.memory_time / self.cache_benefit,
            speedup: self.cache_benefit,
        }
    }

    fn communication_cost(&self, output_bytes: f64, num_devices: u32) -> f64 {
        let Interconnect {
            intra_node_bandwidth,
            inter_node_bandwidth,
            max_devices_per_domain,
        } = self.spec.interconnect;

        if num_devices <= max_devices_per_domain {
            return collective_cost(
                output_bytes,
                (num_devices as f64).log2(),
                intra_node_bandwidth,
            );
        }

        let nodes = num_devices.div_ceil(max_devices_per_domain);
        let intra = collective_cost(
            output_bytes,
            (max_devices_per_domain as f64).log2(),
            intra_node_bandwidth,
        );
        let inter = collective_cost(
            output_bytes / nodes as f64,
            (nodes as f64).log2(),
            inter_node_bandwidth,
        );

        intra + inter
    }

    fn batch_threshold(&self) -> usize {
        300
    }

    fn occupancy(&self, operation: &MatrixOperation) -> Option<f64> {
        let dims = operation.dims();
        let tiles = dims.b.div_ceil(self.occupancy_tile) as f64
            * dims.f.div_ceil(self.occupancy_tile) as f64;
        let slots = self.tiles_per_sm as f64 * self.sm_count as f64;

        Some((tiles / slots).min(1.0))
    }

    fn scaling_efficiency(&self, speedup: f64, num_devices: u32) -> Option<f64> {
        Some(speedup / num_devices as f64)
    }

    fn extra_recommendations(
        &self,
        operation: &MatrixOperation,
        metrics: &SingleDeviceMetrics,
        recommendations: &mut Vec<String>,
    ) {
        let elem = operation.lhs().elem;
        let alignment = Self::alignment(elem);
        let dims = operation.dims();
        let misaligned: Vec<String> = [("B", dims.b), ("D", dims.d), ("F", dims.f)]
            .into_iter()
            .filter(|(_, size)| size % alignment != 0)
            .map(|(name, size)| format!("{name}={size}"))
            .collect();

        if !misaligned.is_empty() {
            recommendations.push(format!(
                "Align B, D and F to multiples of {alignment} for {elem} tensor cores (misaligned: {}).",
                misaligned.join(", ")
            ));
        }

        if metrics.is_compute_bound && elem == ElemType::BF16 {
            recommendations.push(
                "Compute-bound on bf16 tensor cores: f8 doubles peak throughput, and 2:4 structured sparsity on the weights doubles it again."
                    .to_string(),
            );
        }
    }
}
