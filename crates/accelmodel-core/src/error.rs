use crate::{OperationId, OperationKind};

/// Errors returned by every analysis entry point.
///
/// All errors are terminal for the call that produced them. Analyses are deterministic, so
/// retrying reproduces the same failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// No operation is registered under the identifier.
    #[error("No operation registered with id {id}")]
    NotFound {
        /// The identifier that was looked up.
        id: OperationId,
    },

    /// The operation kind can't be modeled.
    #[error("Unsupported operation kind {kind}, only matmul can be analyzed")]
    UnsupportedOperation {
        /// The rejected kind.
        kind: OperationKind,
    },

    /// Multi-device metrics were requested without a sharding configuration.
    #[error("Multi-device analysis requires a sharding configuration")]
    MissingConfiguration,

    /// The operand shapes don't describe a valid matrix multiplication.
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// What is wrong with the shapes.
        reason: String,
    },

    /// The sharding configuration can't be applied.
    #[error("Invalid sharding configuration: {reason}")]
    InvalidSharding {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A hardware profile holds a non-positive constant.
    #[error("Invalid hardware profile: {reason}")]
    InvalidProfile {
        /// The offending constant.
        reason: String,
    },
}

/// Result type of analysis entry points.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
