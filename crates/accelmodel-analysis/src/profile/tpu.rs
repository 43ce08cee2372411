use accelmodel_core::{AnalysisResult, MatrixOperation};
use accelmodel_runtime::config::session::ProfileKind;

use super::{
    AcceleratorProfile, HardwareSpec, Interconnect, MemoryTier, RooflineTimes, ThroughputTable,
    TilingUnit,
};
use crate::{FastMemoryAnalysis, FastMemoryKind, collective_cost};

const GIB: f64 = (1u64 << 30) as f64;
const MIB: f64 = (1u64 << 20) as f64;

/// Systolic-array accelerator with a software-managed scratchpad (VMEM) and a single,
/// uniform inter-chip fabric.
#[derive(Debug, Clone)]
pub struct TpuProfile {
    spec: HardwareSpec,
}

impl TpuProfile {
    /// A profile from custom constants. Fails when a constant is not positive.
    pub fn new(spec: HardwareSpec) -> AnalysisResult<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// TPU v5e: 128x128 MXUs, 16 GiB of HBM and 128 MiB of VMEM.
    pub fn v5e() -> Self {
        Self {
            spec: HardwareSpec {
                name: "TPU v5e".to_string(),
                kind: ProfileKind::Tpu,
                throughput: ThroughputTable::new(3.94e14, 1.97e14, 9.85e13, 3.94e14, 7.88e14),
                main_memory: MemoryTier::new(8.1e11, 16.0 * GIB),
                fast_memory: MemoryTier::new(1.78e13, 128.0 * MIB),
                // ICI is bidirectional, both directions are counted.
                interconnect: Interconnect::new(9.0e10, 9.0e10, 256),
                tiling: TilingUnit::new(128, 128, 128),
            },
        }
    }
}

impl AcceleratorProfile for TpuProfile {
    fn spec(&self) -> &HardwareSpec {
        &self.spec
    }

    /// Both operands have to be resident in VMEM; the output streams back to HBM.
    fn fast_memory(
        &self,
        operation: &MatrixOperation,
        times: &RooflineTimes,
    ) -> FastMemoryAnalysis {
        let bytes = operation.bytes();
        let resident_bytes = bytes.lhs + bytes.rhs;
        let capacity = self.spec.fast_memory.capacity;

        if resident_bytes > capacity {
            return FastMemoryAnalysis::miss(
                FastMemoryKind::Scratchpad,
                resident_bytes,
                capacity,
                times.memory_time,
            );
        }

        let fast_memory_time = bytes.total / self.spec.fast_memory.bandwidth;

        FastMemoryAnalysis {
            kind: FastMemoryKind::Scratchpad,
            resident_bytes,
            capacity,
            fits: true,
            effective_memory_time: fast_memory_time,
            speedup: times.memory_time / fast_memory_time,
        }
    }

    fn communication_cost(&self, output_bytes: f64, num_devices: u32) -> f64 {
        collective_cost(
            output_bytes,
            (num_devices as f64).log2(),
            self.spec.interconnect.intra_node_bandwidth,
        )
    }

    fn batch_threshold(&self) -> usize {
        240
    }
}
