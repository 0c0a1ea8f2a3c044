//! Point-in-time membership snapshots.

use std::sync::Arc;
use std::time::Duration;

use rowan_core::KeyValueStore;
use rowan_core::ReadRequest;
use rowan_core::DEFAULT_READ_TIMEOUT;
use snafu::ResultExt;
use tracing::debug;

use crate::error::CoordinationError;
use crate::error::StorageSnafu;
use crate::types::Member;

/// Configuration for membership listing.
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Deadline for the whole listing call, shared across all reads.
    pub read_timeout: Duration,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Read-only view of which identifiers are currently bound and to whom.
///
/// Independent of the claim path: any process can list members at any time
/// without holding a lease.
pub struct MembershipReader<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: MembershipConfig,
}

impl<S: KeyValueStore + ?Sized + Send + Sync + 'static> MembershipReader<S> {
    /// Create a reader over `store` with the given configuration.
    pub fn new(store: Arc<S>, config: MembershipConfig) -> Self {
        Self { store, config }
    }

    /// Fetch the current binding of each identifier, in input order.
    ///
    /// Unbound identifiers are skipped; absence is valid domain state, not
    /// a fault. Any read error aborts the whole call and discards partial
    /// results, as does the whole-call deadline. Each read is individually
    /// linearizable; the list as a whole is not an atomic snapshot across
    /// keys.
    pub async fn list(&self, identifiers: &[String]) -> Result<Vec<Member>, CoordinationError> {
        match tokio::time::timeout(self.config.read_timeout, self.collect(identifiers)).await {
            Ok(members) => members,
            Err(_) => Err(CoordinationError::Timeout {
                operation: format!("membership listing of {} identifiers", identifiers.len()),
            }),
        }
    }

    async fn collect(&self, identifiers: &[String]) -> Result<Vec<Member>, CoordinationError> {
        let mut members = Vec::new();
        for id in identifiers {
            let result = self
                .store
                .read(ReadRequest::new(id.clone()))
                .await
                .context(StorageSnafu)?;
            match result.kv {
                Some(kv) => members.push(Member {
                    key: kv.key,
                    value: kv.value,
                }),
                None => debug!(identifier = %id, "identifier unbound, skipping"),
            }
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use rowan_core::TxnRequest;
    use rowan_testing::DeterministicKeyValueStore;

    use super::*;

    #[tokio::test]
    async fn lists_bound_identifiers_in_input_order() {
        let store = DeterministicKeyValueStore::new();
        let lease = store.lease_grant(Duration::from_secs(60)).await.unwrap();
        store
            .txn(TxnRequest::create_if_absent("a", "h1", lease.id))
            .await
            .unwrap();
        store
            .txn(TxnRequest::create_if_absent("c", "h3", lease.id))
            .await
            .unwrap();

        let reader = MembershipReader::new(store, MembershipConfig::default());
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let members = reader.list(&ids).await.unwrap();

        assert_eq!(members, vec![
            Member {
                key: "a".to_string(),
                value: "h1".to_string(),
            },
            Member {
                key: "c".to_string(),
                value: "h3".to_string(),
            },
        ]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_snapshot() {
        let store = DeterministicKeyValueStore::new();
        let reader = MembershipReader::new(store, MembershipConfig::default());
        let members = reader.list(&[]).await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn all_unbound_yields_empty_snapshot() {
        let store = DeterministicKeyValueStore::new();
        let reader = MembershipReader::new(store, MembershipConfig::default());
        let ids = vec!["a".to_string(), "b".to_string()];
        let members = reader.list(&ids).await.unwrap();
        assert!(members.is_empty());
    }
}
