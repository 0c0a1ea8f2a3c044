//! Transaction, read, and lease types for the external key-value store.
//!
//! These types describe the narrow surface this system consumes from its
//! store: atomic compare-then-mutate transactions, point reads with version
//! metadata, and expiring leases. The store is expected to evaluate and
//! commit a [`TxnRequest`] as one indivisible step.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_KEY_SIZE;
use crate::constants::MAX_TXN_OPS;
use crate::constants::MAX_VALUE_SIZE;
use crate::error::KeyValueStoreError;

/// Store-assigned lease identifier.
///
/// All keys put under a lease are removed by the store when the lease
/// expires or is revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub u64);

impl LeaseId {
    /// Create a lease identifier from its raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw identifier value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lease granted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseGrant {
    /// Store-assigned identifier for the lease.
    pub id: LeaseId,
    /// TTL the store granted. The countdown restarts on every keepalive.
    pub ttl: Duration,
}

/// Acknowledgment of one successful keepalive round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAliveAck {
    /// The renewed lease.
    pub id: LeaseId,
    /// Remaining TTL after the renewal.
    pub ttl: Duration,
}

/// What a transaction compare inspects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompareTarget {
    /// Key-specific version number. Version 0 means the key does not exist;
    /// the first create sets it to 1.
    Version,
    /// The stored value.
    Value,
}

/// Comparison operator for transaction conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
}

/// A comparison condition evaluated by the store at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxnCompare {
    pub key: String,
    pub target: CompareTarget,
    pub op: CompareOp,
    pub value: String,
}

impl TxnCompare {
    /// Compare a key's version against `version`.
    pub fn version(key: impl Into<String>, op: CompareOp, version: u64) -> Self {
        Self {
            key: key.into(),
            target: CompareTarget::Version,
            op,
            value: version.to_string(),
        }
    }

    /// Compare a key's stored value against `value`.
    pub fn value(key: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: CompareTarget::Value,
            op,
            value: value.into(),
        }
    }
}

/// Mutations that can be performed in a transaction branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxnOp {
    /// Store `value` under `key`, optionally bound to a lease.
    Put {
        key: String,
        value: String,
        lease: Option<LeaseId>,
    },
    /// Remove `key`.
    Delete { key: String },
}

impl TxnOp {
    /// Put without a lease binding.
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
            lease: None,
        }
    }

    /// Put bound to `lease`; the key is removed when the lease goes away.
    pub fn put_with_lease(key: impl Into<String>, value: impl Into<String>, lease: LeaseId) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
            lease: Some(lease),
        }
    }

    /// Delete a key.
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Atomic if/then/else transaction.
///
/// The store evaluates every compare; if all hold it applies the `success`
/// operations, otherwise the `failure` operations. Evaluation and
/// application happen as a single linearizable step, so at most one of
/// several concurrent transactions can observe the same precondition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxnRequest {
    pub compare: Vec<TxnCompare>,
    pub success: Vec<TxnOp>,
    pub failure: Vec<TxnOp>,
}

impl TxnRequest {
    /// Transaction that stores `(key, value)` under `lease` only if `key`
    /// does not exist yet.
    ///
    /// This is the single round-trip replacement for an exists-check
    /// followed by a put: among concurrent callers racing on the same key,
    /// exactly one can observe version 0 at commit.
    pub fn create_if_absent(key: impl Into<String>, value: impl Into<String>, lease: LeaseId) -> Self {
        let key = key.into();
        Self {
            compare: vec![TxnCompare::version(key.clone(), CompareOp::Equal, 0)],
            success: vec![TxnOp::put_with_lease(key, value, lease)],
            failure: Vec::new(),
        }
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxnResult {
    /// Whether all compares held and the `success` branch was applied.
    /// `false` is a normal outcome (the precondition did not hold), not an
    /// error.
    pub succeeded: bool,
}

/// Key-value pair with version metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValueWithRevision {
    /// The key identifying this entry.
    pub key: String,
    /// The stored value.
    pub value: String,
    /// Key-specific version, incremented on each modification. Starts at 1
    /// when the key is first created; 0 is only ever observable inside a
    /// transaction compare, meaning "absent".
    pub version: u64,
}

/// Request to read a single key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadRequest {
    pub key: String,
}

impl ReadRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Response from a read operation. `kv` is `None` when the key does not
/// exist; absence is valid domain state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadResult {
    pub kv: Option<KeyValueWithRevision>,
}

/// Validate a transaction against the fixed size limits.
///
/// Store implementations call this before evaluating a transaction so that
/// oversized or malformed requests fail uniformly across backends.
pub fn validate_txn_request(request: &TxnRequest) -> Result<(), KeyValueStoreError> {
    let check_key = |key: &str| {
        if key.is_empty() {
            return Err(KeyValueStoreError::EmptyKey);
        }
        if key.len() > MAX_KEY_SIZE as usize {
            return Err(KeyValueStoreError::KeyTooLarge {
                size: key.len(),
                max: MAX_KEY_SIZE,
            });
        }
        Ok(())
    };

    let check_value = |value: &str| {
        if value.len() > MAX_VALUE_SIZE as usize {
            return Err(KeyValueStoreError::ValueTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        Ok(())
    };

    let total = request.compare.len() + request.success.len() + request.failure.len();
    if total > MAX_TXN_OPS as usize {
        return Err(KeyValueStoreError::TxnTooLarge {
            size: total,
            max: MAX_TXN_OPS,
        });
    }

    for cmp in &request.compare {
        check_key(&cmp.key)?;
        check_value(&cmp.value)?;
    }
    for op in request.success.iter().chain(request.failure.iter()) {
        match op {
            TxnOp::Put { key, value, .. } => {
                check_key(key)?;
                check_value(value)?;
            }
            TxnOp::Delete { key } => {
                check_key(key)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        let txn = TxnRequest {
            compare: vec![TxnCompare::version("", CompareOp::Equal, 0)],
            success: vec![],
            failure: vec![],
        };
        assert!(matches!(validate_txn_request(&txn), Err(KeyValueStoreError::EmptyKey)));
    }

    #[test]
    fn oversized_key_rejected() {
        let key = "k".repeat(MAX_KEY_SIZE as usize + 1);
        let txn = TxnRequest {
            compare: vec![],
            success: vec![TxnOp::put(key, "v")],
            failure: vec![],
        };
        assert!(matches!(
            validate_txn_request(&txn),
            Err(KeyValueStoreError::KeyTooLarge { .. })
        ));
    }

    #[test]
    fn create_if_absent_shape() {
        let txn = TxnRequest::create_if_absent("shard-00", "host-a", LeaseId::new(9));
        assert!(validate_txn_request(&txn).is_ok());
        assert_eq!(txn.compare, vec![TxnCompare::version("shard-00", CompareOp::Equal, 0)]);
        assert_eq!(txn.success, vec![TxnOp::put_with_lease("shard-00", "host-a", LeaseId::new(9))]);
        assert!(txn.failure.is_empty());
    }

    #[test]
    fn oversized_txn_rejected() {
        let txn = TxnRequest {
            compare: vec![],
            success: (0..=MAX_TXN_OPS).map(|i| TxnOp::delete(format!("k{i}"))).collect(),
            failure: vec![],
        };
        assert!(matches!(
            validate_txn_request(&txn),
            Err(KeyValueStoreError::TxnTooLarge { .. })
        ));
    }
}
