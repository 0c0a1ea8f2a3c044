//! Deterministic in-memory key-value store with lease expiry.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rowan_core::validate_txn_request;
use rowan_core::CompareOp;
use rowan_core::CompareTarget;
use rowan_core::KeepAliveAck;
use rowan_core::KeyValueStore;
use rowan_core::KeyValueStoreError;
use rowan_core::KeyValueWithRevision;
use rowan_core::LeaseGrant;
use rowan_core::LeaseId;
use rowan_core::ReadRequest;
use rowan_core::ReadResult;
use rowan_core::TxnOp;
use rowan_core::TxnRequest;
use rowan_core::TxnResult;
use tokio::sync::RwLock;

/// Versioned value with its optional lease binding.
#[derive(Clone)]
struct VersionedValue {
    value: String,
    version: u64,
    lease: Option<LeaseId>,
}

/// Granted-lease bookkeeping against the logical clock.
#[derive(Clone, Copy)]
struct LeaseRecord {
    ttl: Duration,
    deadline_ms: u64,
}

/// Injected failures, each consumed by the call it fires on.
#[derive(Default)]
struct Faults {
    /// Keys whose next transaction fails at the transport level.
    txn: HashSet<String>,
    /// Number of upcoming keepalive calls that fail.
    keepalive: u32,
    /// Keys whose next committed put stores a different value than
    /// requested.
    corrupt_puts: HashSet<String>,
}

/// A deterministic in-memory key-value store for testing.
///
/// Implements the full store capability trait with predictable behavior:
/// transactions are evaluated atomically under one lock, versions start at 1
/// on first create, and leases expire against an internal logical clock that
/// only moves when [`advance`](Self::advance) is called. Expiry removes
/// every key bound to the expired lease, matching the store-side cleanup the
/// coordination layer relies on.
pub struct DeterministicKeyValueStore {
    data: RwLock<BTreeMap<String, VersionedValue>>,
    leases: RwLock<HashMap<u64, LeaseRecord>>,
    faults: RwLock<Faults>,
    clock_ms: AtomicU64,
    next_lease_id: AtomicU64,
}

impl Default for DeterministicKeyValueStore {
    fn default() -> Self {
        Self::new_inner()
    }
}

impl DeterministicKeyValueStore {
    /// Create a new deterministic store wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::new_inner())
    }

    fn new_inner() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            leases: RwLock::new(HashMap::new()),
            faults: RwLock::new(Faults::default()),
            clock_ms: AtomicU64::new(0),
            next_lease_id: AtomicU64::new(1),
        }
    }

    /// Move the logical clock forward and expire leases whose deadline has
    /// passed, removing every key bound to them.
    pub async fn advance(&self, elapsed: Duration) {
        let now = self
            .clock_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::SeqCst)
            + elapsed.as_millis() as u64;

        let mut leases = self.leases.write().await;
        let expired: Vec<u64> = leases
            .iter()
            .filter(|(_, record)| record.deadline_ms <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            leases.remove(id);
        }
        drop(leases);

        if !expired.is_empty() {
            let mut data = self.data.write().await;
            data.retain(|_, entry| match entry.lease {
                Some(lease) => !expired.contains(&lease.value()),
                None => true,
            });
        }
    }

    /// Make the next transaction referencing `key` fail at the transport
    /// level.
    pub async fn inject_txn_fault(&self, key: &str) {
        self.faults.write().await.txn.insert(key.to_string());
    }

    /// Make the next `count` keepalive calls fail.
    pub async fn inject_keepalive_faults(&self, count: u32) {
        self.faults.write().await.keepalive += count;
    }

    /// Make the next committed put to `key` store a value different from
    /// the one requested.
    pub async fn corrupt_next_put(&self, key: &str) {
        self.faults.write().await.corrupt_puts.insert(key.to_string());
    }

    fn now_ms(&self) -> u64 {
        self.clock_ms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for DeterministicKeyValueStore {
    async fn txn(&self, request: TxnRequest) -> Result<TxnResult, KeyValueStoreError> {
        validate_txn_request(&request)?;

        // Injected transport failure fires before anything commits.
        {
            let mut faults = self.faults.write().await;
            let referenced = request
                .compare
                .iter()
                .map(|cmp| cmp.key.as_str())
                .chain(request.success.iter().chain(request.failure.iter()).map(|op| match op {
                    TxnOp::Put { key, .. } | TxnOp::Delete { key } => key.as_str(),
                }));
            for key in referenced {
                if faults.txn.remove(key) {
                    return Err(KeyValueStoreError::Failed {
                        reason: format!("injected transaction fault on '{key}'"),
                    });
                }
            }
        }

        let leases = self.leases.read().await;
        let mut data = self.data.write().await;

        let mut all_met = true;
        for cmp in &request.compare {
            let entry = data.get(&cmp.key);
            let met = match cmp.target {
                CompareTarget::Version => {
                    let actual = entry.map(|e| e.version).unwrap_or(0);
                    let expected: u64 = cmp.value.parse().unwrap_or(0);
                    match cmp.op {
                        CompareOp::Equal => actual == expected,
                        CompareOp::NotEqual => actual != expected,
                        CompareOp::Greater => actual > expected,
                        CompareOp::Less => actual < expected,
                    }
                }
                CompareTarget::Value => {
                    let actual = entry.map(|e| e.value.as_str()).unwrap_or("");
                    match cmp.op {
                        CompareOp::Equal => actual == cmp.value,
                        CompareOp::NotEqual => actual != cmp.value,
                        CompareOp::Greater => actual > cmp.value.as_str(),
                        CompareOp::Less => actual < cmp.value.as_str(),
                    }
                }
            };
            if !met {
                all_met = false;
                break;
            }
        }

        let ops = if all_met { &request.success } else { &request.failure };
        for op in ops {
            match op {
                TxnOp::Put { key, value, lease } => {
                    if let Some(lease) = lease {
                        if !leases.contains_key(&lease.value()) {
                            return Err(KeyValueStoreError::LeaseNotFound {
                                lease_id: lease.value(),
                            });
                        }
                    }
                    let stored = if self.faults.write().await.corrupt_puts.remove(key) {
                        format!("{value}:corrupted")
                    } else {
                        value.clone()
                    };
                    let version = data.get(key).map(|e| e.version + 1).unwrap_or(1);
                    data.insert(key.clone(), VersionedValue {
                        value: stored,
                        version,
                        lease: *lease,
                    });
                }
                TxnOp::Delete { key } => {
                    data.remove(key);
                }
            }
        }

        Ok(TxnResult { succeeded: all_met })
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        let data = self.data.read().await;
        Ok(ReadResult {
            kv: data.get(&request.key).map(|entry| KeyValueWithRevision {
                key: request.key.clone(),
                value: entry.value.clone(),
                version: entry.version,
            }),
        })
    }

    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseGrant, KeyValueStoreError> {
        let id = self.next_lease_id.fetch_add(1, Ordering::SeqCst);
        let record = LeaseRecord {
            ttl,
            deadline_ms: self.now_ms() + ttl.as_millis() as u64,
        };
        self.leases.write().await.insert(id, record);
        Ok(LeaseGrant {
            id: LeaseId::new(id),
            ttl,
        })
    }

    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAliveAck, KeyValueStoreError> {
        {
            let mut faults = self.faults.write().await;
            if faults.keepalive > 0 {
                faults.keepalive -= 1;
                return Err(KeyValueStoreError::Failed {
                    reason: "injected keepalive fault".to_string(),
                });
            }
        }

        let mut leases = self.leases.write().await;
        match leases.get_mut(&lease.value()) {
            Some(record) => {
                record.deadline_ms = self.now_ms() + record.ttl.as_millis() as u64;
                Ok(KeepAliveAck {
                    id: lease,
                    ttl: record.ttl,
                })
            }
            None => Err(KeyValueStoreError::LeaseNotFound {
                lease_id: lease.value(),
            }),
        }
    }

    async fn lease_revoke(&self, lease: LeaseId) -> Result<(), KeyValueStoreError> {
        let mut leases = self.leases.write().await;
        if leases.remove(&lease.value()).is_none() {
            return Err(KeyValueStoreError::LeaseNotFound {
                lease_id: lease.value(),
            });
        }
        drop(leases);

        let mut data = self.data.write().await;
        data.retain(|_, entry| entry.lease != Some(lease));
        Ok(())
    }
}
