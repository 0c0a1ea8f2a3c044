//! The store capability trait.
//!
//! [`KeyValueStore`] is the only seam between this system and the external
//! store. Everything the coordination layer does, from claiming an
//! identifier to keeping its lease alive, goes through these five methods,
//! which lets tests substitute a deterministic in-memory store without
//! touching any claim logic.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::KeyValueStoreError;
use crate::kv::KeepAliveAck;
use crate::kv::LeaseGrant;
use crate::kv::LeaseId;
use crate::kv::ReadRequest;
use crate::kv::ReadResult;
use crate::kv::TxnRequest;
use crate::kv::TxnResult;

/// Linearizable key-value store with atomic transactions and expiring
/// leases.
///
/// Implementations must evaluate and commit a [`TxnRequest`] as one
/// indivisible step: among concurrent transactions whose compares inspect
/// the same key, at most one can observe any given precondition at commit.
/// Reads are individually linearizable; no cross-key snapshot is implied.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically evaluate `request.compare` and apply the matching branch.
    ///
    /// A failed compare is reported through `TxnResult::succeeded`, not as
    /// an error; `Err` means the call itself failed (transport/store).
    async fn txn(&self, request: TxnRequest) -> Result<TxnResult, KeyValueStoreError>;

    /// Read a single key with version metadata.
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError>;

    /// Grant a lease with the given TTL.
    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseGrant, KeyValueStoreError>;

    /// One renewal round-trip: restart the lease's TTL countdown.
    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAliveAck, KeyValueStoreError>;

    /// Revoke a lease early. The store removes every key bound to it.
    async fn lease_revoke(&self, lease: LeaseId) -> Result<(), KeyValueStoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn txn(&self, request: TxnRequest) -> Result<TxnResult, KeyValueStoreError> {
        (**self).txn(request).await
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        (**self).read(request).await
    }

    async fn lease_grant(&self, ttl: Duration) -> Result<LeaseGrant, KeyValueStoreError> {
        (**self).lease_grant(ttl).await
    }

    async fn lease_keepalive(&self, lease: LeaseId) -> Result<KeepAliveAck, KeyValueStoreError> {
        (**self).lease_keepalive(lease).await
    }

    async fn lease_revoke(&self, lease: LeaseId) -> Result<(), KeyValueStoreError> {
        (**self).lease_revoke(lease).await
    }
}
