use std::sync::Arc;

use accelmodel_core::{
    AnalysisError, AnalysisResult, ElemType, MatrixOperation, OperandDescriptor, OperationId,
    OperationKind, ShardingConfig,
};
use accelmodel_runtime::{
    OperationRegistry,
    config::{GlobalConfig, Logger, analysis::AnalysisLogLevel, session::ProfileKind},
};

use crate::{
    AcceleratorProfile, AnalysisReport, MetricsReport, MultiDeviceMetrics, RooflineData,
    RooflinePoint, RooflineTimes, SingleDeviceMetrics, profile_for, recommend, sample_roofline,
};

/// Analyzes operations registered against one accelerator profile.
///
/// Operations are registered once and can then be analyzed any number of times; every analysis
/// is a pure function of the operation and the profile constants.
#[derive(Debug)]
pub struct PerformanceAnalyzer<P: AcceleratorProfile> {
    profile: P,
    registry: OperationRegistry,
    logger: spin::Mutex<Logger>,
}

impl PerformanceAnalyzer<Box<dyn AcceleratorProfile>> {
    /// Analyzer for a profile chosen at runtime.
    pub fn from_kind(kind: ProfileKind) -> Self {
        Self::new(profile_for(kind))
    }

    /// Analyzer for the profile selected in the [global configuration](GlobalConfig).
    pub fn from_config() -> Self {
        Self::from_kind(GlobalConfig::get().session.profile)
    }
}

impl<P: AcceleratorProfile> PerformanceAnalyzer<P> {
    /// Create an analyzer logging according to the global configuration.
    pub fn new(profile: P) -> Self {
        Self::with_logger(profile, Logger::new())
    }

    /// Create an analyzer with an explicit logger.
    pub fn with_logger(profile: P, logger: Logger) -> Self {
        Self {
            profile,
            registry: OperationRegistry::new(),
            logger: spin::Mutex::new(logger),
        }
    }

    /// The modeled accelerator.
    pub fn profile(&self) -> &P {
        &self.profile
    }

    /// Operations registered so far.
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Create an operation and register it, returning its identifier.
    pub fn register_operation(
        &self,
        kind: OperationKind,
        lhs: OperandDescriptor,
        rhs: OperandDescriptor,
        out_elem: ElemType,
    ) -> AnalysisResult<OperationId> {
        let operation = MatrixOperation::new(kind, lhs, rhs, out_elem)?;
        Ok(self.registry.register(operation))
    }

    /// Register an existing operation.
    pub fn register(&self, operation: MatrixOperation) -> OperationId {
        self.registry.register(operation)
    }

    /// The operation registered under `id`.
    pub fn operation(&self, id: OperationId) -> AnalysisResult<Arc<MatrixOperation>> {
        self.registry.get(id)
    }

    /// Cost of the registered operation on a single device.
    pub fn single_device_metrics(&self, id: OperationId) -> AnalysisResult<SingleDeviceMetrics> {
        let operation = self.operation(id)?;
        self.evaluate(&operation)
    }

    /// Cost of the registered operation sharded according to `config`.
    ///
    /// Fails with [AnalysisError::MissingConfiguration] when no configuration is given, whether
    /// or not `id` is registered.
    pub fn multi_device_metrics(
        &self,
        id: OperationId,
        config: Option<&ShardingConfig>,
    ) -> AnalysisResult<MultiDeviceMetrics> {
        let config = config.ok_or(AnalysisError::MissingConfiguration)?;
        let operation = self.operation(id)?;

        self.evaluate_sharded(&operation, config)
    }

    /// Single-device metrics, plus multi-device metrics when `multi_device` is requested.
    pub fn metrics(
        &self,
        id: OperationId,
        multi_device: bool,
        config: Option<&ShardingConfig>,
    ) -> AnalysisResult<MetricsReport> {
        if multi_device && config.is_none() {
            return Err(AnalysisError::MissingConfiguration);
        }

        let single_device = self.single_device_metrics(id)?;
        let multi_device = match (multi_device, config) {
            (true, Some(config)) => Some(self.multi_device_metrics(id, Some(config))?),
            _ => None,
        };

        Ok(MetricsReport {
            single_device,
            multi_device,
        })
    }

    /// Metrics, recommendations and roofline data of the registered operation.
    pub fn analyze(&self, id: OperationId) -> AnalysisResult<AnalysisReport> {
        let operation = self.operation(id)?;
        let metrics = self.evaluate(&operation)?;
        let recommendations = self.generate_recommendations(&operation, &metrics);
        let roofline = self.generate_roofline_data(&operation, &metrics);

        self.log(AnalysisLogLevel::Full, || {
            format!(
                "[{}] {id} recommendations:\n  - {}",
                self.profile.name(),
                recommendations.join("\n  - ")
            )
        });

        Ok(AnalysisReport {
            metrics,
            recommendations,
            roofline,
        })
    }

    /// Ordered advice for `operation` given its `metrics`.
    pub fn generate_recommendations(
        &self,
        operation: &MatrixOperation,
        metrics: &SingleDeviceMetrics,
    ) -> Vec<String> {
        recommend(&self.profile, operation, metrics)
    }

    /// Roofline of the operation's element type, sampled over five decades of intensity.
    pub fn generate_roofline_data(
        &self,
        operation: &MatrixOperation,
        metrics: &SingleDeviceMetrics,
    ) -> RooflineData {
        let spec = self.profile.spec();
        let elem = operation.lhs().elem;
        let peak_flops = spec.throughput.peak_flops(elem);
        let memory_bandwidth = spec.main_memory.bandwidth;

        RooflineData {
            peak_flops,
            memory_bandwidth,
            ridge_point: spec.balanced_intensity(elem),
            samples: sample_roofline(peak_flops, memory_bandwidth),
            operation: RooflinePoint {
                intensity: metrics.arithmetic_intensity,
                achieved_flops: metrics.achieved_flops,
            },
        }
    }

    /// Single-device metrics of any operation, registered or not.
    pub fn evaluate(&self, operation: &MatrixOperation) -> AnalysisResult<SingleDeviceMetrics> {
        let flops = operation.flops()?;
        let arithmetic_intensity = operation.arithmetic_intensity()?;
        let bytes = operation.bytes();

        let spec = self.profile.spec();
        let elem = operation.lhs().elem;
        let peak_flops = spec.throughput.peak_flops(elem);
        let peak_balanced_intensity = spec.balanced_intensity(elem);

        let times = RooflineTimes::new(flops / peak_flops, bytes.total / spec.main_memory.bandwidth);
        let fast_memory = self.profile.fast_memory(operation, &times);
        let effective_memory_time = fast_memory.effective_memory_time;

        let lower_bound_time = times.compute_time.max(effective_memory_time);
        let upper_bound_time = times.compute_time + effective_memory_time;
        let achieved_flops = match lower_bound_time > 0.0 {
            true => flops / lower_bound_time,
            false => 0.0,
        };

        let metrics = SingleDeviceMetrics {
            operation: operation.id(),
            profile: spec.name.clone(),
            flops,
            bytes,
            arithmetic_intensity,
            peak_flops,
            peak_balanced_intensity,
            is_compute_bound: arithmetic_intensity > peak_balanced_intensity,
            compute_time: times.compute_time,
            memory_time: times.memory_time,
            effective_memory_time,
            lower_bound_time,
            upper_bound_time,
            achieved_flops,
            utilization: self.profile.tiling_utilization(operation),
            fast_memory,
            occupancy: self.profile.occupancy(operation),
        };

        self.log(AnalysisLogLevel::Basic, || {
            format!(
                "[{}] {} {:?} x {:?}: {:.3e} FLOPs, intensity {:.2} (ridge {:.2}), {}-bound, time in [{:.3e}, {:.3e}] s",
                metrics.profile,
                metrics.operation,
                operation.lhs().shape,
                operation.rhs().shape,
                metrics.flops,
                metrics.arithmetic_intensity,
                metrics.peak_balanced_intensity,
                if metrics.is_compute_bound { "compute" } else { "memory" },
                metrics.lower_bound_time,
                metrics.upper_bound_time,
            )
        });
        self.log(AnalysisLogLevel::Full, || {
            format!(
                "[{}] {} utilization {:.3}/{:.3}/{:.3}, {} fits={} speedup={:.2}, occupancy={:?}",
                metrics.profile,
                metrics.operation,
                metrics.utilization.lhs.value,
                metrics.utilization.contraction.value,
                metrics.utilization.rhs.value,
                metrics.fast_memory.kind,
                metrics.fast_memory.fits,
                metrics.fast_memory.speedup,
                metrics.occupancy,
            )
        });

        Ok(metrics)
    }

    /// Multi-device metrics of any operation, registered or not.
    ///
    /// The per-device metrics describe the shard, which carries its own identifier.
    pub fn evaluate_sharded(
        &self,
        operation: &MatrixOperation,
        config: &ShardingConfig,
    ) -> AnalysisResult<MultiDeviceMetrics> {
        let sharded = operation.sharded(config)?;
        let per_device = self.evaluate(&sharded)?;
        let single_device = self.evaluate(operation)?;

        // Partial sums over the contraction axis must be all-reduced on the full output.
        let communication_cost = match config.requires_reduction() {
            true => self
                .profile
                .communication_cost(operation.bytes().out, config.num_devices),
            false => 0.0,
        };

        let total_time = per_device.lower_bound_time.max(communication_cost);
        let speedup_over_single_device = single_device.lower_bound_time / total_time;
        let sharding_efficiency = per_device.lower_bound_time / total_time;
        let scaling_efficiency = self
            .profile
            .scaling_efficiency(speedup_over_single_device, config.num_devices);

        self.log(AnalysisLogLevel::Basic, || {
            format!(
                "[{}] {} sharded over {} devices: communication {:.3e} s, total {:.3e} s, speedup {:.2}x, efficiency {:.3}",
                self.profile.name(),
                operation.id(),
                config.num_devices,
                communication_cost,
                total_time,
                speedup_over_single_device,
                sharding_efficiency,
            )
        });

        Ok(MultiDeviceMetrics {
            sharding: *config,
            per_device,
            communication_cost,
            total_time,
            speedup_over_single_device,
            sharding_efficiency,
            scaling_efficiency,
        })
    }

    fn log<F: FnOnce() -> String>(&self, level: AnalysisLogLevel, message: F) {
        let mut logger = self.logger.lock();
        if logger.is_enabled() && logger.log_level_analysis() >= level {
            logger.log_analysis(&message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GpuProfile, ROOFLINE_SAMPLES, TpuProfile, collective_cost};
    use accelmodel_core::ShardDim;
    use pretty_assertions::assert_eq;

    fn descriptors(
        b: usize,
        d: usize,
        f: usize,
        elem: ElemType,
    ) -> (OperandDescriptor, OperandDescriptor) {
        (
            OperandDescriptor::new([b, d], elem),
            OperandDescriptor::new([d, f], elem),
        )
    }

    fn register<P: AcceleratorProfile>(
        analyzer: &PerformanceAnalyzer<P>,
        b: usize,
        d: usize,
        f: usize,
        elem: ElemType,
    ) -> OperationId {
        let (lhs, rhs) = descriptors(b, d, f, elem);
        analyzer
            .register_operation(OperationKind::Matmul, lhs, rhs, elem)
            .unwrap()
    }

    #[test_log::test]
    fn square_bf16_on_tpu_matches_manual_ridge_point() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 256, 256, 256, ElemType::BF16);
        let metrics = analyzer.single_device_metrics(id).unwrap();

        let ridge = 1.97e14 / 8.1e11;
        let intensity = 33_554_432.0 / (3.0 * 256.0 * 256.0 * 2.0);

        assert_eq!(metrics.flops, 33_554_432.0);
        assert_eq!(metrics.peak_balanced_intensity, ridge);
        assert_eq!(metrics.arithmetic_intensity, intensity);
        assert_eq!(metrics.is_compute_bound, intensity > ridge);
        assert!(!metrics.is_compute_bound);
        assert_eq!(metrics.utilization.lhs.value, 1.0);
        assert_eq!(metrics.utilization.contraction.value, 1.0);
        assert_eq!(metrics.utilization.rhs.value, 1.0);
        assert_eq!(metrics.compute_time, 33_554_432.0 / 1.97e14);
        assert_eq!(metrics.memory_time, metrics.bytes.total / 8.1e11);
        assert!(metrics.fast_memory.fits);
        assert_eq!(metrics.occupancy, None);
    }

    #[test_log::test]
    fn unaligned_batch_underutilizes_the_mxu() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 100, 256, 256, ElemType::BF16);
        let report = analyzer.analyze(id).unwrap();

        assert_eq!(report.metrics.utilization.lhs.value, 0.78125);
        assert!(report.recommendations.iter().any(|r| {
            r.contains("128x128x128") && r.contains("batch 100 -> 128 (78.1% utilized)")
        }));
    }

    fn tpu_with_ridge(bf16_flops: f64, bandwidth: f64) -> TpuProfile {
        let mut spec = TpuProfile::v5e().spec().clone();
        spec.throughput.bf16 = bf16_flops;
        spec.main_memory.bandwidth = bandwidth;

        TpuProfile::new(spec).unwrap()
    }

    #[test_log::test]
    fn intensity_on_the_ridge_point_is_not_compute_bound() {
        // 6x6x6 bf16: 432 FLOPs over 216 bytes, exactly on a ridge of 2.
        let analyzer = PerformanceAnalyzer::new(tpu_with_ridge(2.0e12, 1.0e12));
        let id = register(&analyzer, 6, 6, 6, ElemType::BF16);
        let metrics = analyzer.single_device_metrics(id).unwrap();

        assert_eq!(metrics.arithmetic_intensity, 2.0);
        assert_eq!(metrics.peak_balanced_intensity, 2.0);
        assert!(!metrics.is_compute_bound);

        let below_ridge = PerformanceAnalyzer::new(tpu_with_ridge(2.0e12, 1.25e12));
        let id = register(&below_ridge, 6, 6, 6, ElemType::BF16);
        assert!(below_ridge.single_device_metrics(id).unwrap().is_compute_bound);

        let above_ridge = PerformanceAnalyzer::new(tpu_with_ridge(2.5e12, 1.0e12));
        let id = register(&above_ridge, 6, 6, 6, ElemType::BF16);
        assert!(!above_ridge.single_device_metrics(id).unwrap().is_compute_bound);
    }

    #[test_log::test]
    fn time_bounds_are_ordered() {
        let tpu = PerformanceAnalyzer::new(TpuProfile::v5e());
        let gpu = PerformanceAnalyzer::new(GpuProfile::h100());

        for (b, d, f) in [(1, 1, 1), (100, 300, 7), (4096, 1024, 4096), (16, 8192, 8192)] {
            for elem in ElemType::ALL {
                for metrics in [
                    tpu.single_device_metrics(register(&tpu, b, d, f, elem)).unwrap(),
                    gpu.single_device_metrics(register(&gpu, b, d, f, elem)).unwrap(),
                ] {
                    assert!(metrics.lower_bound_time <= metrics.upper_bound_time);
                    assert!(metrics.lower_bound_time < metrics.upper_bound_time);
                    assert_eq!(
                        metrics.lower_bound_time,
                        metrics.compute_time.max(metrics.effective_memory_time)
                    );
                }
            }
        }
    }

    #[test_log::test]
    fn gpu_reports_occupancy_and_cache() {
        let analyzer = PerformanceAnalyzer::new(GpuProfile::h100());
        let id = register(&analyzer, 4096, 1024, 1024, ElemType::BF16);
        let metrics = analyzer.single_device_metrics(id).unwrap();

        assert_eq!(metrics.occupancy, Some(1.0));
        assert!(metrics.fast_memory.fits);
        assert_eq!(metrics.effective_memory_time, metrics.memory_time / 1.5);
    }

    #[test_log::test]
    fn unregistered_id_is_not_found() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let (lhs, rhs) = descriptors(8, 8, 8, ElemType::BF16);
        let id = MatrixOperation::matmul(lhs, rhs, ElemType::BF16).unwrap().id();
        let config = ShardingConfig::new(4).with_lhs(ShardDim::Rows);
        let not_found = AnalysisError::NotFound { id };

        assert_eq!(analyzer.single_device_metrics(id), Err(not_found.clone()));
        assert_eq!(
            analyzer.multi_device_metrics(id, Some(&config)),
            Err(not_found.clone())
        );
        assert_eq!(analyzer.metrics(id, false, None), Err(not_found.clone()));
        assert_eq!(analyzer.analyze(id), Err(not_found));
    }

    #[test_log::test]
    fn multi_device_without_configuration_fails() {
        let analyzer = PerformanceAnalyzer::new(GpuProfile::h100());
        let id = register(&analyzer, 64, 64, 64, ElemType::BF16);

        assert_eq!(
            analyzer.multi_device_metrics(id, None),
            Err(AnalysisError::MissingConfiguration)
        );
        assert_eq!(
            analyzer.metrics(id, true, None),
            Err(AnalysisError::MissingConfiguration)
        );
    }

    #[test_log::test]
    fn unsupported_kind_fails_on_analysis() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let (lhs, rhs) = descriptors(8, 8, 8, ElemType::F32);
        let id = analyzer
            .register_operation(OperationKind::Elementwise, lhs, rhs, ElemType::F32)
            .unwrap();

        assert_eq!(
            analyzer.single_device_metrics(id),
            Err(AnalysisError::UnsupportedOperation {
                kind: OperationKind::Elementwise
            })
        );
    }

    #[test_log::test]
    fn metrics_without_multi_device_ignores_configuration() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 512, 512, 512, ElemType::BF16);
        let config = ShardingConfig::new(4).with_lhs(ShardDim::Rows);

        let report = analyzer.metrics(id, false, Some(&config)).unwrap();
        assert!(report.multi_device.is_none());

        let report = analyzer.metrics(id, true, Some(&config)).unwrap();
        let multi = report.multi_device.unwrap();
        assert_eq!(multi.sharding, config);
        assert_eq!(report.single_device, analyzer.single_device_metrics(id).unwrap());
    }

    #[test_log::test]
    fn batch_sharding_needs_no_collective() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 4096, 4096, 4096, ElemType::BF16);
        let config = ShardingConfig::new(8).with_lhs(ShardDim::Rows);
        let multi = analyzer.multi_device_metrics(id, Some(&config)).unwrap();

        assert_eq!(multi.communication_cost, 0.0);
        assert_eq!(multi.total_time, multi.per_device.lower_bound_time);
        assert_eq!(multi.sharding_efficiency, 1.0);
        assert_eq!(multi.per_device.flops, 2.0 * 512.0 * 4096.0 * 4096.0);
        assert!(multi.speedup_over_single_device > 1.0);
        assert_eq!(multi.scaling_efficiency, None);
    }

    #[test_log::test]
    fn contraction_sharding_pays_an_all_reduce() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 4096, 4096, 4096, ElemType::BF16);
        let config = ShardingConfig::new(4)
            .with_lhs(ShardDim::Cols)
            .with_rhs(ShardDim::Rows);
        let multi = analyzer.multi_device_metrics(id, Some(&config)).unwrap();
        let out_bytes = 4096.0 * 4096.0 * 2.0;

        assert_eq!(multi.communication_cost, collective_cost(out_bytes, 2.0, 9.0e10));
        assert_eq!(
            multi.total_time,
            multi.per_device.lower_bound_time.max(multi.communication_cost)
        );
        assert_eq!(multi.per_device.utilization.contraction.dim, 1024);
    }

    #[test_log::test]
    fn gpu_reports_scaling_efficiency() {
        let analyzer = PerformanceAnalyzer::new(GpuProfile::h100());
        let id = register(&analyzer, 8192, 8192, 8192, ElemType::BF16);
        let config = ShardingConfig::new(16).with_lhs(ShardDim::Cols);
        let multi = analyzer.multi_device_metrics(id, Some(&config)).unwrap();

        assert_eq!(
            multi.scaling_efficiency,
            Some(multi.speedup_over_single_device / 16.0)
        );
        assert!(multi.communication_cost > 0.0);
    }

    #[test_log::test]
    fn sharding_efficiency_and_speedup_are_bounded() {
        let tpu = PerformanceAnalyzer::new(TpuProfile::v5e());
        let gpu = PerformanceAnalyzer::new(GpuProfile::h100());
        let configs = [
            ShardingConfig::new(1).with_lhs(ShardDim::Rows),
            ShardingConfig::new(2).with_lhs(ShardDim::Cols),
            ShardingConfig::new(3).with_rhs(ShardDim::Rows),
            ShardingConfig::new(8).with_rhs(ShardDim::Cols),
            ShardingConfig::new(64)
                .with_lhs(ShardDim::Cols)
                .with_rhs(ShardDim::Rows),
            ShardingConfig::new(1024).with_lhs(ShardDim::Rows),
        ];

        for (b, d, f) in [(16, 4096, 4096), (4096, 4096, 4096), (100, 300, 70)] {
            let tpu_id = register(&tpu, b, d, f, ElemType::BF16);
            let gpu_id = register(&gpu, b, d, f, ElemType::BF16);

            for config in configs.iter() {
                for multi in [
                    tpu.multi_device_metrics(tpu_id, Some(config)).unwrap(),
                    gpu.multi_device_metrics(gpu_id, Some(config)).unwrap(),
                ] {
                    assert!(multi.sharding_efficiency > 0.0);
                    assert!(multi.sharding_efficiency <= 1.0);
                    assert!(multi.speedup_over_single_device > 0.0);
                }
            }
        }
    }

    #[test_log::test]
    fn zero_devices_is_rejected() {
        let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
        let id = register(&analyzer, 64, 64, 64, ElemType::BF16);
        let config = ShardingConfig::new(0).with_lhs(ShardDim::Rows);

        assert!(matches!(
            analyzer.multi_device_metrics(id, Some(&config)),
            Err(AnalysisError::InvalidSharding { .. })
        ));
    }

    #[test_log::test]
    fn roofline_has_fixed_samples() {
        let analyzer = PerformanceAnalyzer::new(GpuProfile::h100());
        let id = register(&analyzer, 1024, 1024, 1024, ElemType::F8);
        let report = analyzer.analyze(id).unwrap();
        let roofline = report.roofline;

        assert_eq!(roofline.samples.len(), ROOFLINE_SAMPLES);
        assert_eq!(roofline.peak_flops, 1.979e15);
        assert_eq!(roofline.ridge_point, 1.979e15 / 3.35e12);
        assert!(
            roofline
                .samples
                .iter()
                .all(|s| s.achievable_flops <= roofline.peak_flops)
        );
        assert_eq!(
            roofline.operation.intensity,
            report.metrics.arithmetic_intensity
        );
        assert_eq!(
            roofline.operation.achieved_flops,
            report.metrics.flops / report.metrics.lower_bound_time
        );
    }

    #[test_log::test]
    fn runtime_profile_selection() {
        let analyzer = PerformanceAnalyzer::from_kind(ProfileKind::Gpu);
        let id = register(&analyzer, 64, 64, 64, ElemType::BF16);

        assert_eq!(analyzer.profile().kind(), ProfileKind::Gpu);
        assert!(analyzer.single_device_metrics(id).unwrap().occupancy.is_some());
    }
}
