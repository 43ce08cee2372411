//! Closed-form performance model for matrix multiplication on TPU-like and GPU-like
//! accelerators.
//!
//! ```no_run
//! use accelmodel::{ElemType, OperandDescriptor, OperationKind, TpuProfile, PerformanceAnalyzer};
//!
//! let analyzer = PerformanceAnalyzer::new(TpuProfile::v5e());
//! let id = analyzer
//!     .register_operation(
//!         OperationKind::Matmul,
//!         OperandDescriptor::new([256, 1024], ElemType::BF16),
//!         OperandDescriptor::new([1024, 1024], ElemType::BF16),
//!         ElemType::BF16,
//!     )
//!     .unwrap();
//! let report = analyzer.analyze(id).unwrap();
//! println!("{}", report.to_json().unwrap());
//! ```
#![warn(missing_docs)]

pub use accelmodel_analysis::*;
pub use accelmodel_core::*;
pub use accelmodel_runtime::OperationRegistry;
pub use accelmodel_runtime::config;

/// Analyzer whose profile is chosen at runtime.
pub type Session = PerformanceAnalyzer<Box<dyn AcceleratorProfile>>;

/// Start a session on the profile selected by the global configuration.
///
/// The profile comes from the `session.profile` entry of `accelmodel.toml`, overridden by the
/// `ACCELMODEL_PROFILE` environment variable.
pub fn session() -> Session {
    let session = Session::from_config();
    log::info!("Starting an analysis session on {}", session.profile().name());
    session
}
