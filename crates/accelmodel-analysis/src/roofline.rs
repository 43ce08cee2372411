use serde::{Deserialize, Serialize};

/// Number of roofline samples, one every 0.1 decade from `10^-1` to `10^4`.
pub const ROOFLINE_SAMPLES: usize = 51;

const FIRST_DECADE: f64 = -1.0;
const DECADE_STEP: f64 = 0.1;

/// One point of the roofline curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RooflineSample {
    /// FLOPs per byte.
    pub intensity: f64,
    /// `min(peak_flops, bandwidth · intensity)`
    pub achievable_flops: f64,
    /// The intensity is below the ridge point.
    pub memory_bound: bool,
}

/// The analyzed operation placed on the roofline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RooflinePoint {
    /// FLOPs per byte of the operation.
    pub intensity: f64,
    /// FLOP/s implied by its lower bound time.
    pub achieved_flops: f64,
}

/// Roofline curve of a profile for one element type, with the operation overlaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RooflineData {
    /// Compute ceiling.
    pub peak_flops: f64,
    /// Slope of the memory-bound region.
    pub memory_bandwidth: f64,
    /// Intensity where both ceilings meet.
    pub ridge_point: f64,
    /// Log-spaced samples of the curve.
    pub samples: Vec<RooflineSample>,
    /// The operation.
    pub operation: RooflinePoint,
}

/// Sample the roofline of a device with `peak_flops` and `memory_bandwidth`.
pub fn sample_roofline(peak_flops: f64, memory_bandwidth: f64) -> Vec<RooflineSample> {
    let ridge_point = peak_flops / memory_bandwidth;

    (0..ROOFLINE_SAMPLES)
        .map(|i| {
            let intensity = 10f64.powf(FIRST_DECADE + i as f64 * DECADE_STEP);

            RooflineSample {
                intensity,
                achievable_flops: peak_flops.min(memory_bandwidth * intensity),
                memory_bound: intensity < ridge_point,
            }
        })
        .collect()
}
