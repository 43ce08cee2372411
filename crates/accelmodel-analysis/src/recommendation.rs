use accelmodel_core::{ElemType, MatrixOperation};

use crate::{AcceleratorProfile, FastMemoryKind, SingleDeviceMetrics};

/// Axes below this utilization trigger a padding recommendation.
pub const UTILIZATION_THRESHOLD: f64 = 0.9;

const MIB: f64 = (1u64 << 20) as f64;

/// Ordered advice for `operation` given its single-device `metrics`.
///
/// The shared rules run first, in a fixed order, followed by the profile's own rules. When
/// nothing fires a single "no recommendations" sentence is returned.
pub fn recommend<P: AcceleratorProfile + ?Sized>(
    profile: &P,
    operation: &MatrixOperation,
    metrics: &SingleDeviceMetrics,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    let lhs = operation.lhs();
    let rhs = operation.rhs();

    if !metrics.is_compute_bound {
        recommendations.push(format!(
            "Memory-bound: arithmetic intensity {:.1} FLOPs/byte is below the ridge point of {:.1}. Increase the batch size to reuse the weights across more rows.",
            metrics.arithmetic_intensity, metrics.peak_balanced_intensity
        ));
    }

    if lhs.elem == ElemType::F32 && rhs.elem == ElemType::F32 {
        recommendations.push(
            "Both operands are f32. Casting them to bf16 halves the bytes moved from memory."
                .to_string(),
        );
    }

    let fast_memory = &metrics.fast_memory;
    if fast_memory.fits {
        let resident = fast_memory.resident_bytes / MIB;
        let capacity = fast_memory.capacity / MIB;
        recommendations.push(match fast_memory.kind {
            FastMemoryKind::Scratchpad => format!(
                "Operands ({resident:.2} MiB) fit in {} ({capacity:.0} MiB). Keep them resident there to avoid main-memory round-trips ({:.1}x faster memory access).",
                fast_memory.kind, fast_memory.speedup
            ),
            FastMemoryKind::Cache => format!(
                "Weights ({resident:.2} MiB) fit in {} ({capacity:.0} MiB). Schedule tiles so they stay cache-resident ({:.1}x effective bandwidth).",
                fast_memory.kind, fast_memory.speedup
            ),
        });
    }

    let underutilized: Vec<String> = metrics
        .utilization
        .axes()
        .iter()
        .filter(|(_, axis)| axis.value < UTILIZATION_THRESHOLD)
        .map(|(name, axis)| {
            format!(
                "{name} {} -> {} ({:.1}% utilized)",
                axis.dim,
                axis.padded(),
                axis.value * 100.0
            )
        })
        .collect();

    if !underutilized.is_empty() {
        recommendations.push(format!(
            "Pad dimensions to multiples of the {} tile: {}.",
            profile.spec().tiling,
            underutilized.join(", ")
        ));
    }

    let batch = operation.dims().b;
    let threshold = profile.batch_threshold();
    if lhs.elem == ElemType::BF16 && batch < threshold {
        recommendations.push(format!(
            "Batch size {batch} is below {threshold} for bf16 on {}. Use at least {threshold} rows to become compute-bound.",
            profile.name()
        ));
    }

    profile.extra_recommendations(operation, metrics, &mut recommendations);

    if recommendations.is_empty() {
        recommendations.push(format!(
            "No recommendations: the operation is well balanced for {}.",
            profile.name()
        ));
    }

    recommendations
}
