//! One-shot claim of a single identifier from an ordered candidate pool.

use std::sync::Arc;
use std::time::Duration;

use rowan_core::KeyValueStore;
use rowan_core::LeaseId;
use rowan_core::ReadRequest;
use rowan_core::TxnRequest;
use rowan_core::DEFAULT_READ_TIMEOUT;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::CoordinationError;

/// Configuration for claim attempts.
#[derive(Debug, Clone)]
pub struct ClaimConfig {
    /// Deadline for the post-commit verification read.
    pub verify_timeout: Duration,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            verify_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Claims exactly one identifier from a candidate pool.
///
/// Each candidate is attempted with a single atomic transaction ("if the
/// key does not exist, put it bound to the caller's lease"), so competing
/// processes never race between a check and a write; the store's
/// linearizability guarantees at most one of them observes the key as
/// absent at commit.
///
/// The claimer never loops internally and never backs off: one pass over
/// the pool, then either a claimed identifier or the pool-exhaustion
/// failure. Retry policy (and refreshing the candidate list) belongs to
/// the caller.
pub struct SlotClaimer<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: ClaimConfig,
}

impl<S: KeyValueStore + ?Sized + Send + Sync + 'static> SlotClaimer<S> {
    /// Create a claimer over `store` with the given configuration.
    pub fn new(store: Arc<S>, config: ClaimConfig) -> Self {
        Self { store, config }
    }

    /// Claim one identifier from `candidates`, binding it to `label` under
    /// `lease`.
    ///
    /// Candidates are attempted in order; order is the only priority
    /// signal. A transaction whose call fails (transport/store) skips to
    /// the next candidate, favoring liveness over precise error reporting,
    /// and a transaction that commits without succeeding means another
    /// process won that key, which also advances to the next candidate. A
    /// successful transaction is read back and must return exactly `label`;
    /// anything else aborts the whole claim with the verification-anomaly
    /// failure, since the store would be contradicting its own commit
    /// acknowledgment.
    pub async fn claim(
        &self,
        lease: LeaseId,
        label: &str,
        candidates: &[String],
    ) -> Result<String, CoordinationError> {
        for id in candidates {
            let request = TxnRequest::create_if_absent(id.clone(), label, lease);
            let result = match self.store.txn(request).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(candidate = %id, error = %error, "claim transaction failed, trying next candidate");
                    continue;
                }
            };

            if !result.succeeded {
                debug!(candidate = %id, "candidate already claimed");
                continue;
            }

            self.verify(id, label).await?;
            info!(identifier = %id, label = %label, lease = %lease, "identifier claimed");
            return Ok(id.clone());
        }

        debug!(attempted = candidates.len(), "candidate pool exhausted");
        Err(CoordinationError::PoolExhausted {
            attempted: candidates.len(),
        })
    }

    /// Read back a freshly claimed key and require the stored value to be
    /// `label`.
    async fn verify(&self, key: &str, label: &str) -> Result<(), CoordinationError> {
        let read = tokio::time::timeout(
            self.config.verify_timeout,
            self.store.read(ReadRequest::new(key)),
        )
        .await;

        let actual = match read {
            Ok(Ok(result)) => result.kv.map(|kv| kv.value),
            Ok(Err(error)) => {
                warn!(key = %key, error = %error, "verification read failed");
                None
            }
            Err(_) => {
                warn!(key = %key, "verification read timed out");
                None
            }
        };

        if actual.as_deref() == Some(label) {
            return Ok(());
        }
        Err(CoordinationError::VerificationFailed {
            key: key.to_string(),
            expected: label.to_string(),
            actual,
        })
    }
}
