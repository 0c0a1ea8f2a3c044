//! Distributed identifier allocation and lease-backed membership.
//!
//! Many independent processes race to claim exactly one identifier each
//! from a finite, pre-agreed pool (shard numbers, worker slots), with the
//! claim bound to the claiming process's liveness through a store-side
//! lease. All coordination is delegated to an external linearizable
//! key-value store (see [`rowan_core::KeyValueStore`]); this crate holds no
//! locks and no shared mutable state of its own.
//!
//! Three components compose around a shared store client:
//!
//! - [`LeaseSupervisor`] - grants a lease and runs its background renewal
//!   loop under a caller-supplied cancellation token
//! - [`SlotClaimer`] - binds exactly one candidate identifier to a label
//!   under a lease, with at-most-one-success enforced by the store's atomic
//!   create-if-absent transaction, and verifies the bind with a read-back
//! - [`MembershipReader`] - fetches a point-in-time view of which
//!   identifiers are bound and to whom
//!
//! # Example
//!
//! ```ignore
//! use rowan_coordination::{ClaimConfig, LeaseConfig, LeaseSupervisor, SlotClaimer};
//! use tokio_util::sync::CancellationToken;
//!
//! let supervisor = LeaseSupervisor::new(store.clone(), LeaseConfig::default());
//! let grant = supervisor.acquire().await?;
//!
//! let cancel = CancellationToken::new();
//! let keepalive = supervisor.start_keepalive(grant.id, cancel.clone()).await?;
//!
//! let claimer = SlotClaimer::new(store, ClaimConfig::default());
//! let slot = claimer.claim(grant.id, "host-a", &candidates).await?;
//! // Hold the lease for the process lifetime; `slot` is released when the
//! // keepalive stops and the lease expires, or on explicit revoke.
//! ```

mod claim;
mod error;
mod lease;
mod membership;
mod types;

pub use claim::ClaimConfig;
pub use claim::SlotClaimer;
pub use error::CoordinationError;
pub use lease::KeepAliveHandle;
pub use lease::LeaseConfig;
pub use lease::LeaseSupervisor;
pub use membership::MembershipConfig;
pub use membership::MembershipReader;
pub use types::Member;
