//! Public types for the registry orchestrator.

use thiserror::Error;

use crate::customer::CustomerId;
use crate::stores::traits::StoreError;

/// Failure surfaced by a registry operation.
///
/// Write paths report a single aggregate failure: once the record store
/// write has committed, any downstream store failure comes back as
/// [`OutOfSync`](Self::OutOfSync) — the operation failed even though the
/// source of truth holds the new state. No automatic compensation is
/// attempted; retry or reconcile at the caller.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The record store call itself failed. For create/update this means no
    /// store was touched; the operation had no side effects.
    #[error("record store failure during {op}: {source}")]
    Record {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    /// The search index failed on a pure lookup (search path).
    #[error("search index lookup failed: {0}")]
    Index(#[source] StoreError),

    /// A store failed after earlier steps of the operation had already
    /// committed, leaving the backing stores potentially disagreeing.
    #[error("{op} for customer {id} failed against the {store}; stores may be out of sync: {source}")]
    OutOfSync {
        op: &'static str,
        id: CustomerId,
        store: &'static str,
        #[source]
        source: StoreError,
    },
}

impl RegistryError {
    /// Whether the record store committed state before this failure.
    #[must_use]
    pub fn record_committed(&self) -> bool {
        matches!(self, Self::OutOfSync { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_sync_display_names_store() {
        let err = RegistryError::OutOfSync {
            op: "create",
            id: 7,
            store: "cache",
            source: StoreError::Backend("connection reset".to_string()),
        };

        let msg = err.to_string();
        assert!(msg.contains("create"));
        assert!(msg.contains("7"));
        assert!(msg.contains("cache"));
        assert!(err.record_committed());
    }

    #[test]
    fn test_record_failure_not_committed() {
        let err = RegistryError::Record {
            op: "create",
            source: StoreError::Backend("down".to_string()),
        };
        assert!(!err.record_committed());
    }
}
