//! Lease acquisition and background renewal.
//!
//! A lease is the liveness anchor for every identifier a process claims:
//! the store removes all keys bound to a lease once its TTL runs out. The
//! [`LeaseSupervisor`] grants leases and runs the one background task in
//! this system, a renewal loop that restarts the TTL countdown on a fixed
//! interval until its cancellation token fires, after which the lease is
//! left to expire naturally unless explicitly revoked.

use std::sync::Arc;
use std::time::Duration;

use rowan_core::KeepAliveAck;
use rowan_core::KeyValueStore;
use rowan_core::LeaseGrant;
use rowan_core::LeaseId;
use rowan_core::DEFAULT_LEASE_TTL;
use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::CoordinationError;
use crate::error::LeaseSetupSnafu;
use crate::error::StorageSnafu;

/// Capacity of the renewal-ack channel. Renewal never blocks on a slow
/// consumer; acks beyond this are dropped while renewals continue.
const ACK_CHANNEL_CAPACITY: usize = 16;

/// Configuration for lease acquisition and renewal.
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// TTL requested for granted leases.
    pub ttl: Duration,
    /// How often the keepalive loop renews. Must be well under `ttl` so a
    /// missed round-trip or two does not lose the lease.
    pub renew_interval: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LEASE_TTL,
            // 20 seconds (renew 3x per TTL)
            renew_interval: DEFAULT_LEASE_TTL / 3,
        }
    }
}

/// Grants leases and keeps them alive.
pub struct LeaseSupervisor<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: LeaseConfig,
}

impl<S: KeyValueStore + ?Sized + Send + Sync + 'static> LeaseSupervisor<S> {
    /// Create a supervisor over `store` with the given configuration.
    pub fn new(store: Arc<S>, config: LeaseConfig) -> Self {
        Self { store, config }
    }

    /// Request a lease with the configured TTL.
    pub async fn acquire(&self) -> Result<LeaseGrant, CoordinationError> {
        let grant = self
            .store
            .lease_grant(self.config.ttl)
            .await
            .context(LeaseSetupSnafu)?;
        info!(lease = %grant.id, ttl_secs = grant.ttl.as_secs(), "lease acquired");
        Ok(grant)
    }

    /// Start the background renewal loop for `lease`.
    ///
    /// One renewal round-trip is performed up front; if it fails, the error
    /// is returned and the caller must not assume the lease survives. The
    /// spawned loop then renews every `renew_interval` until `cancel`
    /// fires. Renewal failures are logged and retried on the next tick;
    /// if renewals cannot get through, the lease simply expires at the
    /// store and takes its bound keys with it.
    ///
    /// The keepalive must be running before (or concurrently with) the
    /// first claim that uses `lease`; a lapsed lease drops claimed keys.
    pub async fn start_keepalive(
        &self,
        lease: LeaseId,
        cancel: CancellationToken,
    ) -> Result<KeepAliveHandle, CoordinationError> {
        let ack = self
            .store
            .lease_keepalive(lease)
            .await
            .context(LeaseSetupSnafu)?;

        let (ack_tx, ack_rx) = mpsc::channel(ACK_CHANNEL_CAPACITY);
        let _ = ack_tx.try_send(ack);

        let store = Arc::clone(&self.store);
        let renew_interval = self.config.renew_interval;
        let task = tokio::spawn(async move {
            run_keepalive_loop(store, lease, renew_interval, cancel, ack_tx).await;
        });

        Ok(KeepAliveHandle { acks: ack_rx, task })
    }

    /// Explicit early release; the store removes every key bound to the
    /// lease. Graceful-shutdown path only; TTL expiry is the correctness
    /// fallback.
    pub async fn revoke(&self, lease: LeaseId) -> Result<(), CoordinationError> {
        self.store.lease_revoke(lease).await.context(StorageSnafu)?;
        info!(lease = %lease, "lease revoked");
        Ok(())
    }
}

/// Periodic renewal until cancellation.
async fn run_keepalive_loop<S: KeyValueStore + ?Sized>(
    store: Arc<S>,
    lease: LeaseId,
    renew_interval: Duration,
    cancel: CancellationToken,
    acks: mpsc::Sender<KeepAliveAck>,
) {
    let mut ticker = tokio::time::interval(renew_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The setup round-trip just renewed; consume the immediate first tick.
    ticker.tick().await;

    info!(
        lease = %lease,
        interval_ms = renew_interval.as_millis() as u64,
        "keepalive started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(lease = %lease, "keepalive stopped");
                break;
            }
            _ = ticker.tick() => {
                match store.lease_keepalive(lease).await {
                    Ok(ack) => {
                        debug!(lease = %lease, ttl_secs = ack.ttl.as_secs(), "lease renewed");
                        if acks.try_send(ack).is_err() {
                            debug!(lease = %lease, "ack channel full or closed, dropping ack");
                        }
                    }
                    Err(error) => {
                        // Keep trying on the next tick; the lease expires
                        // at the store if renewals cannot get through.
                        warn!(lease = %lease, error = %error, "lease renewal failed");
                    }
                }
            }
        }
    }
}

/// Handle for a running keepalive loop.
pub struct KeepAliveHandle {
    acks: mpsc::Receiver<KeepAliveAck>,
    task: JoinHandle<()>,
}

impl KeepAliveHandle {
    /// Receive the next renewal ack. Returns `None` once the loop has
    /// exited and all buffered acks are drained.
    pub async fn ack(&mut self) -> Option<KeepAliveAck> {
        self.acks.recv().await
    }

    /// Wait for the renewal loop to exit.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use rowan_testing::DeterministicKeyValueStore;

    use super::*;

    fn fast_config() -> LeaseConfig {
        LeaseConfig {
            ttl: Duration::from_secs(60),
            renew_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn acquire_returns_configured_ttl() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store, fast_config());

        let grant = supervisor.acquire().await.unwrap();
        assert_eq!(grant.ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn keepalive_delivers_acks_until_cancelled() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store, fast_config());
        let grant = supervisor.acquire().await.unwrap();

        let cancel = CancellationToken::new();
        let mut handle = supervisor.start_keepalive(grant.id, cancel.clone()).await.unwrap();

        // Setup ack plus at least one periodic renewal.
        let first = handle.ack().await.unwrap();
        assert_eq!(first.id, grant.id);
        let second = tokio::time::timeout(Duration::from_secs(1), handle.ack())
            .await
            .expect("renewal ack within a second")
            .unwrap();
        assert_eq!(second.id, grant.id);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop exits after cancellation");
    }

    #[tokio::test]
    async fn keepalive_setup_failure_is_surfaced() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store.clone(), fast_config());
        let grant = supervisor.acquire().await.unwrap();

        store.inject_keepalive_faults(1).await;
        let result = supervisor.start_keepalive(grant.id, CancellationToken::new()).await;
        assert!(matches!(result, Err(CoordinationError::LeaseSetup { .. })));
    }

    #[tokio::test]
    async fn keepalive_for_unknown_lease_fails_setup() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store, fast_config());

        let result = supervisor
            .start_keepalive(LeaseId::new(404), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(CoordinationError::LeaseSetup { .. })));
    }

    #[tokio::test]
    async fn renewal_failures_do_not_stop_the_loop() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store.clone(), fast_config());
        let grant = supervisor.acquire().await.unwrap();

        let cancel = CancellationToken::new();
        let mut handle = supervisor.start_keepalive(grant.id, cancel.clone()).await.unwrap();
        let _ = handle.ack().await;

        store.inject_keepalive_faults(2).await;

        // The loop rides out the faulted renewals and keeps delivering.
        let ack = tokio::time::timeout(Duration::from_secs(1), handle.ack())
            .await
            .expect("ack after transient renewal failures")
            .unwrap();
        assert_eq!(ack.id, grant.id);

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test]
    async fn revoke_unknown_lease_is_a_storage_error() {
        let store = DeterministicKeyValueStore::new();
        let supervisor = LeaseSupervisor::new(store, fast_config());

        let result = supervisor.revoke(LeaseId::new(404)).await;
        assert!(matches!(result, Err(CoordinationError::Storage { .. })));
    }
}
