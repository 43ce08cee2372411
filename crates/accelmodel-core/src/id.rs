use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

/// Identifier of a registered [operation](crate::MatrixOperation).
///
/// Identifiers come from a process-wide monotonic counter, so two operations never share one.
#[derive(
    Copy, Clone, Hash, PartialEq, Eq, Debug, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OperationId {
    value: u64,
}

impl OperationId {
    /// Create a new ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let value = COUNTER.fetch_add(1, Ordering::Relaxed);
        if value == u64::MAX {
            core::panic!("Operation ID overflowed");
        }
        Self { value }
    }

    /// The raw counter value.
    pub fn value(&self) -> u64 {
        self.value
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "op-{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..256).map(|_| OperationId::new()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 1024);
    }

    #[test]
    fn ids_are_monotonic() {
        let first = OperationId::new();
        let second = OperationId::new();
        assert!(second > first);
        assert_eq!(format!("{first}"), format!("op-{}", first.value()));
    }
}
