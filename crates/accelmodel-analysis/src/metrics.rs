use accelmodel_core::{OperationBytes, OperationId, ShardingConfig};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{RooflineData, TilingUtilization};

/// How the fast memory tier is managed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FastMemoryKind {
    /// Software-managed scratchpad, data is placed explicitly.
    #[display("VMEM")]
    Scratchpad,
    /// Hardware-managed cache.
    #[display("L2")]
    Cache,
}

/// Whether the resident working set fits in fast memory and what it saves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FastMemoryAnalysis {
    /// The tier that was checked.
    pub kind: FastMemoryKind,
    /// Bytes that have to stay resident for the benefit to apply.
    pub resident_bytes: f64,
    /// Capacity of the tier.
    pub capacity: f64,
    /// `resident_bytes <= capacity`
    pub fits: bool,
    /// Memory time once the fast tier is accounted for.
    pub effective_memory_time: f64,
    /// `memory_time / effective_memory_time`
    pub speedup: f64,
}

impl FastMemoryAnalysis {
    /// The working set doesn't fit, memory time is unchanged.
    pub fn miss(kind: FastMemoryKind, resident_bytes: f64, capacity: f64, memory_time: f64) -> Self {
        Self {
            kind,
            resident_bytes,
            capacity,
            fits: false,
            effective_memory_time: memory_time,
            speedup: 1.0,
        }
    }
}

/// Cost of an operation on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleDeviceMetrics {
    /// The analyzed operation.
    pub operation: OperationId,
    /// Name of the profile it was analyzed on.
    pub profile: String,
    /// Floating point operations.
    pub flops: f64,
    /// Byte footprint.
    pub bytes: OperationBytes,
    /// FLOPs per byte.
    pub arithmetic_intensity: f64,
    /// Peak FLOP/s for the lhs element type.
    pub peak_flops: f64,
    /// Ridge point, `peak_flops / main memory bandwidth`.
    pub peak_balanced_intensity: f64,
    /// `arithmetic_intensity > peak_balanced_intensity`
    pub is_compute_bound: bool,
    /// `flops / peak_flops`
    pub compute_time: f64,
    /// `total bytes / main memory bandwidth`
    pub memory_time: f64,
    /// Memory time after the fast-memory effect.
    pub effective_memory_time: f64,
    /// `max(compute_time, effective_memory_time)`, perfect overlap.
    pub lower_bound_time: f64,
    /// `compute_time + effective_memory_time`, no overlap.
    pub upper_bound_time: f64,
    /// `flops / lower_bound_time`
    pub achieved_flops: f64,
    /// Tiling-unit utilization per axis.
    pub utilization: TilingUtilization,
    /// Fast-memory residency.
    pub fast_memory: FastMemoryAnalysis,
    /// Fraction of the compute units kept busy, when the profile models it.
    pub occupancy: Option<f64>,
}

/// Cost of an operation sharded across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDeviceMetrics {
    /// The sharding that was applied.
    pub sharding: ShardingConfig,
    /// Metrics of the shard computed by one device.
    pub per_device: SingleDeviceMetrics,
    /// Time of the collective reducing partial outputs, zero when none is needed.
    pub communication_cost: f64,
    /// `max(per_device.lower_bound_time, communication_cost)`
    pub total_time: f64,
    /// Unsharded lower bound over `total_time`.
    pub speedup_over_single_device: f64,
    /// `per_device.lower_bound_time / total_time`, in `(0, 1]`.
    pub sharding_efficiency: f64,
    /// `speedup / num_devices`, when the profile reports it.
    pub scaling_efficiency: Option<f64>,
}

/// Answer to a metrics request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Metrics of the whole operation on one device.
    pub single_device: SingleDeviceMetrics,
    /// Metrics of the sharded operation, when requested.
    pub multi_device: Option<MultiDeviceMetrics>,
}

/// Everything a presentation layer needs for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Single-device metrics.
    pub metrics: SingleDeviceMetrics,
    /// Ordered advice.
    pub recommendations: Vec<String>,
    /// Roofline samples and the operation's point.
    pub roofline: RooflineData,
}

impl AnalysisReport {
    /// Serialize the report to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl MetricsReport {
    /// Serialize the report to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
