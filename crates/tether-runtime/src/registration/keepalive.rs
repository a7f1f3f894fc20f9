use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use tether_core::{Coordinator, LeaseId, TetherError};

use super::status::{KeepaliveState, RegistrationStatus};

/// Keepalive loop configuration.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Interval between renewals.
    pub interval: Duration,
}

impl KeepaliveConfig {
    /// Renew at half the lease TTL.
    pub fn for_ttl(ttl_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(ttl_secs) / 2,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self::for_ttl(10)
    }
}

/// Renews one lease for the lifetime of the process.
///
/// The loop is `Running` until either a renewal fails (`Failed`, returned as
/// `RenewalFailed`) or the shutdown signal fires (`Stopped`, returned as
/// `Ok`). A single failed renewal is terminal: there is no retry and no
/// backoff, because a lease that may have lapsed means the registration can
/// no longer be trusted.
pub struct KeepaliveScheduler {
    coordinator: Arc<dyn Coordinator>,
    lease_id: LeaseId,
    config: KeepaliveConfig,
    status: Arc<RegistrationStatus>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl KeepaliveScheduler {
    /// Create a scheduler for the lease tracked by `status`.
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        status: Arc<RegistrationStatus>,
        config: KeepaliveConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            coordinator,
            lease_id: status.lease_id(),
            config,
            status,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// The lease being renewed.
    pub fn lease_id(&self) -> LeaseId {
        self.lease_id
    }

    /// Shared registration status.
    pub fn status(&self) -> Arc<RegistrationStatus> {
        self.status.clone()
    }

    pub fn state(&self) -> KeepaliveState {
        self.status.state()
    }

    /// Stop the loop after the current tick.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Run the keepalive loop until it fails or is stopped.
    ///
    /// Ticks are scheduled from the start of the loop, not from the end of
    /// the previous renewal, so slow endpoints do not stretch the period.
    pub async fn run(&self) -> tether_core::Result<()> {
        if self.config.interval.is_zero() {
            return Err(TetherError::InvalidArgument(
                "keepalive interval must be positive".to_string(),
            ));
        }

        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Keepalive started for lease {} (every {:?})",
            self.lease_id,
            self.config.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.renew_once().await {
                        self.status.set_state(KeepaliveState::Failed);
                        tracing::error!("Lease keepalive failed: {}", e);
                        return Err(e);
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        self.status.set_state(KeepaliveState::Stopped);
                        tracing::info!("Keepalive for lease {} shutting down", self.lease_id);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One renewal attempt.
    async fn renew_once(&self) -> tether_core::Result<()> {
        let lease = self
            .coordinator
            .renew_lease(self.lease_id)
            .await
            .map_err(|e| TetherError::renewal(self.lease_id, e))?;

        if !lease.is_alive() {
            return Err(TetherError::renewal(
                self.lease_id,
                TetherError::LeaseExpired(self.lease_id),
            ));
        }

        self.status.record_renewal(lease.ttl_secs);
        tracing::debug!("Renewed lease {} (TTL={}s)", self.lease_id, lease.ttl_secs);
        Ok(())
    }
}
