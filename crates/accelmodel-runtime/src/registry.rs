use std::sync::Arc;

use accelmodel_core::{AnalysisError, AnalysisResult, MatrixOperation, OperationId};
use hashbrown::HashMap;

/// Operations registered during a session, keyed by their identifier.
///
/// Operations are immutable and never removed once registered. Registration and lookup are
/// guarded by a mutex so a registry can be shared between threads.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: spin::Mutex<HashMap<OperationId, Arc<MatrixOperation>>>,
}

impl OperationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the operation and return its identifier.
    pub fn register(&self, operation: MatrixOperation) -> OperationId {
        let id = operation.id();
        log::debug!(
            "Registering {} {id}: {:?} x {:?}",
            operation.kind(),
            operation.lhs(),
            operation.rhs()
        );
        self.operations.lock().insert(id, Arc::new(operation));
        id
    }

    /// The operation registered under `id`.
    pub fn get(&self, id: OperationId) -> AnalysisResult<Arc<MatrixOperation>> {
        self.operations
            .lock()
            .get(&id)
            .cloned()
            .ok_or(AnalysisError::NotFound { id })
    }

    /// Whether an operation is registered under `id`.
    pub fn contains(&self, id: OperationId) -> bool {
        self.operations.lock().contains_key(&id)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    /// Whether no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of all registered operations, in registration order.
    pub fn ids(&self) -> Vec<OperationId> {
        let mut ids: Vec<_> = self.operations.lock().keys().copied().collect();
        ids.sort();
        ids
    }
}
