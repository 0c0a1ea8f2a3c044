//! Error types for coordination operations.

use rowan_core::KeyValueStoreError;
use snafu::Snafu;

/// Errors from coordination operations.
///
/// Contention (losing the race for a candidate identifier) is not
/// represented here at all; it is a normal outcome that advances the claim
/// loop to the next candidate.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinationError {
    /// Lease could not be granted, or its keepalive could not be started.
    /// The caller must not assume any lease survives past this error.
    #[snafu(display("lease setup failed: {source}"))]
    LeaseSetup {
        /// The underlying store failure.
        source: KeyValueStoreError,
    },

    /// Every candidate in the pool was already claimed or unusable.
    ///
    /// Not a store fault: the caller is expected to supply a refreshed
    /// candidate list and decide whether to retry.
    #[snafu(display("candidate pool exhausted after {attempted} candidates"))]
    PoolExhausted {
        /// Number of candidates attempted.
        attempted: usize,
    },

    /// A freshly claimed key did not read back as the value that was
    /// written. The store acknowledged the commit, so this is a hard
    /// correctness anomaly; it is never retried and never downgraded to
    /// contention.
    #[snafu(display("verification failed for key '{key}': wrote '{expected}', read back {actual:?}"))]
    VerificationFailed {
        /// The key that was claimed.
        key: String,
        /// The value the claim transaction wrote.
        expected: String,
        /// What the follow-up read returned (`None`: missing, read error,
        /// or deadline expiry).
        actual: Option<String>,
    },

    /// Underlying storage error on a read path.
    #[snafu(display("storage error: {source}"))]
    Storage {
        /// The underlying store failure.
        source: KeyValueStoreError,
    },

    /// Operation exceeded its deadline.
    #[snafu(display("operation timed out: {operation}"))]
    Timeout {
        /// Description of the operation.
        operation: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhausted_display() {
        let err = CoordinationError::PoolExhausted { attempted: 4 };
        assert_eq!(err.to_string(), "candidate pool exhausted after 4 candidates");
    }

    #[test]
    fn verification_failed_display() {
        let err = CoordinationError::VerificationFailed {
            key: "slot-2".to_string(),
            expected: "host-a".to_string(),
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "verification failed for key 'slot-2': wrote 'host-a', read back None"
        );
    }
}
