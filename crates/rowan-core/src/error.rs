//! Error types for store operations.

use thiserror::Error;

/// Errors returned by a [`KeyValueStore`](crate::traits::KeyValueStore)
/// implementation.
///
/// Note that a failed transaction compare is *not* an error; it is reported
/// as `TxnResult { succeeded: false }`. This enum covers transport and
/// store-level failures only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyValueStoreError {
    /// Requested key was not found.
    #[error("key '{key}' not found")]
    NotFound {
        /// Key the client attempted to read.
        key: String,
    },

    /// Backend failed (network/storage/etc).
    #[error("operation failed: {reason}")]
    Failed {
        /// Description of the backend failure.
        reason: String,
    },

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout {
        /// Deadline that was exceeded, in milliseconds.
        duration_ms: u64,
    },

    /// A transaction referenced an empty key.
    #[error("empty key")]
    EmptyKey,

    /// Key exceeds the fixed size limit.
    #[error("key size {size} exceeds maximum of {max} bytes")]
    KeyTooLarge {
        /// Size of the offending key.
        size: usize,
        /// The fixed limit.
        max: u32,
    },

    /// Value exceeds the fixed size limit.
    #[error("value size {size} exceeds maximum of {max} bytes")]
    ValueTooLarge {
        /// Size of the offending value.
        size: usize,
        /// The fixed limit.
        max: u32,
    },

    /// Transaction carries more compares/operations than the fixed limit.
    #[error("transaction size {size} exceeds maximum of {max} operations")]
    TxnTooLarge {
        /// Total compares plus operations in the transaction.
        size: usize,
        /// The fixed limit.
        max: u32,
    },

    /// Lease does not exist or has already expired.
    #[error("lease {lease_id} not found or expired")]
    LeaseNotFound {
        /// The lease the operation referenced.
        lease_id: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = KeyValueStoreError::NotFound {
            key: "shard-03".to_string(),
        };
        assert_eq!(err.to_string(), "key 'shard-03' not found");
    }

    #[test]
    fn failed_display() {
        let err = KeyValueStoreError::Failed {
            reason: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "operation failed: connection reset");
    }

    #[test]
    fn lease_not_found_display() {
        let err = KeyValueStoreError::LeaseNotFound { lease_id: 7 };
        assert_eq!(err.to_string(), "lease 7 not found or expired");
    }

    #[test]
    fn error_equality() {
        let a = KeyValueStoreError::EmptyKey;
        let b = KeyValueStoreError::EmptyKey;
        let c = KeyValueStoreError::Timeout { duration_ms: 100 };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
