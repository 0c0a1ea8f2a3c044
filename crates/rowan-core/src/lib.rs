//! Core types and traits for Rowan identifier allocation.
//!
//! This crate defines the capability surface the coordination layer
//! consumes from an external linearizable key-value store: atomic
//! compare-then-mutate transactions, point reads, and expiring leases. It
//! carries no coordination logic of its own and is designed to be a
//! lightweight dependency for both the core crate and store adapters.
//!
//! # Key Components
//!
//! - **Trait**: [`KeyValueStore`]
//! - **Types**: [`TxnRequest`], [`ReadRequest`], [`LeaseGrant`], etc.
//! - **Constants**: fixed resource limits and stack-wide defaults

pub mod constants;
pub mod error;
pub mod kv;
pub mod traits;

pub use constants::DEFAULT_LEASE_TTL;
pub use constants::DEFAULT_READ_TIMEOUT;
pub use constants::MAX_KEY_SIZE;
pub use constants::MAX_TXN_OPS;
pub use constants::MAX_VALUE_SIZE;
pub use error::KeyValueStoreError;
pub use kv::validate_txn_request;
pub use kv::CompareOp;
pub use kv::CompareTarget;
pub use kv::KeepAliveAck;
pub use kv::KeyValueWithRevision;
pub use kv::LeaseGrant;
pub use kv::LeaseId;
pub use kv::ReadRequest;
pub use kv::ReadResult;
pub use kv::TxnCompare;
pub use kv::TxnOp;
pub use kv::TxnRequest;
pub use kv::TxnResult;
pub use traits::KeyValueStore;
