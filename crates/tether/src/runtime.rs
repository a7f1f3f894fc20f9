//! Process orchestration: register, keep the lease alive, serve HTTP.
//!
//! Startup is strictly sequential (grant, put, then the first keepalive tick
//! is scheduled); afterwards the keepalive and the HTTP server run as
//! independent tasks.

use std::sync::Arc;

use tokio::sync::broadcast;

use tether_core::error::{Result, TetherError};
use tether_core::{Coordinator, ServiceIdentity, TetherConfig};
use tether_runtime::{
    CoordinatorClient, HttpServer, KeepaliveConfig, KeepaliveScheduler, LeaseManager,
    RegistrationStatus, ServerConfig, ServerState,
};

/// The tether sidecar runtime.
pub struct Tether {
    config: TetherConfig,
    coordinator: Option<Arc<dyn Coordinator>>,
    identity: Option<ServiceIdentity>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Tether {
    /// Create a new builder for configuring tether.
    pub fn builder() -> TetherBuilder {
        TetherBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// Sender that stops a running instance cleanly.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Register, then renew and serve until shutdown or lease loss.
    ///
    /// Returns `RegistrationFailed` if startup registration fails and
    /// `RenewalFailed` if the keepalive loses the lease. `Ok` means a clean
    /// shutdown was requested.
    pub async fn run(self) -> Result<()> {
        let identity = match self.identity {
            Some(identity) => identity,
            None => ServiceIdentity::resolve(&self.config.service).await?,
        };

        let coordinator: Arc<dyn Coordinator> = match self.coordinator {
            Some(coordinator) => coordinator,
            None => {
                let client = CoordinatorClient::from_config(&self.config.coordinator)?;
                tracing::info!(
                    "Coordinator endpoints: {} (timeout {:?})",
                    client.endpoints().join(", "),
                    client.timeout()
                );
                Arc::new(client)
            }
        };

        let ttl_secs = self.config.lease.ttl_secs;
        tracing::info!("Registering {} -> {}", identity.key, identity.value);

        let manager = LeaseManager::new(coordinator);
        let lease = manager
            .start(ttl_secs, identity.key.as_bytes(), identity.value.as_bytes())
            .await?;

        tracing::info!("Lease created (TTL={}s)", ttl_secs);

        let status = Arc::new(RegistrationStatus::new(lease));
        let keepalive = Arc::new(KeepaliveScheduler::new(
            manager.coordinator(),
            status.clone(),
            KeepaliveConfig::for_ttl(ttl_secs),
        ));

        let mut keepalive_handle = {
            let keepalive = keepalive.clone();
            tokio::spawn(async move { keepalive.run().await })
        };

        let server = HttpServer::new(
            ServerConfig {
                port: self.config.service.port,
            },
            ServerState { identity, status },
        );
        let addr = server.addr();
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                keepalive.stop();
                return Err(TetherError::Io(e));
            }
        };
        tracing::info!("Listening on {}", addr);

        let mut server_handle = tokio::spawn(server.serve(listener));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let outcome = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                None
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Received shutdown notification");
                None
            }
            joined = &mut keepalive_handle => Some(match joined {
                Ok(result) => result,
                Err(e) => Err(TetherError::Internal(format!("Keepalive task panicked: {}", e))),
            }),
            served = &mut server_handle => Some(match served {
                Ok(Ok(())) => Err(TetherError::Internal("HTTP server exited".to_string())),
                Ok(Err(e)) => Err(TetherError::Io(e)),
                Err(e) => Err(TetherError::Internal(format!("HTTP server task panicked: {}", e))),
            }),
        };

        match outcome {
            Some(result) => {
                server_handle.abort();
                keepalive.stop();
                result
            }
            None => {
                keepalive.stop();
                if let Err(e) = keepalive_handle.await {
                    tracing::warn!("Keepalive task did not stop cleanly: {}", e);
                }
                server_handle.abort();
                tracing::info!("tether stopped");
                Ok(())
            }
        }
    }
}

/// Builder for configuring the tether runtime.
pub struct TetherBuilder {
    config: Option<TetherConfig>,
    coordinator: Option<Arc<dyn Coordinator>>,
    identity: Option<ServiceIdentity>,
}

impl TetherBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            coordinator: None,
            identity: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: TetherConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this coordinator instead of the etcd client built from config.
    pub fn coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Use a fixed identity instead of resolving one at startup.
    pub fn identity(mut self, identity: ServiceIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Build the tether runtime.
    pub fn build(self) -> Result<Tether> {
        let config = self
            .config
            .ok_or_else(|| TetherError::Config("Configuration is required".to_string()))?;
        config.validate()?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Tether {
            config,
            coordinator: self.coordinator,
            identity: self.identity,
            shutdown_tx,
        })
    }
}

impl Default for TetherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tether_core::{Lease, LeaseId};
    use tether_runtime::testing::{RecordedCall, Reply, ScriptedCoordinator};

    fn test_config() -> TetherConfig {
        let mut config = TetherConfig::default();
        config.service.port = 0;
        config
    }

    fn identity() -> ServiceIdentity {
        ServiceIdentity::new("h1", "10.0.0.5", 8080, "/services/backend/")
    }

    fn build(coordinator: Arc<ScriptedCoordinator>) -> Tether {
        Tether::builder()
            .config(test_config())
            .coordinator(coordinator)
            .identity(identity())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_config() {
        assert!(TetherBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_validates_config() {
        let mut config = TetherConfig::default();
        config.lease.ttl_secs = 0;
        let result = Tether::builder().config(config).build();
        assert!(matches!(result, Err(TetherError::Config(_))));
    }

    #[test]
    fn test_builder_with_config() {
        let tether = Tether::builder().config(TetherConfig::default()).build().unwrap();
        assert_eq!(tether.config().lease.ttl_secs, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_on_lost_lease() {
        let coordinator = Arc::new(
            ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10))
                .with_renewals([Reply::Ok, Reply::Unreachable]),
        );

        let err = build(coordinator.clone()).run().await.unwrap_err();

        assert!(matches!(err, TetherError::RenewalFailed { .. }));
        assert_eq!(
            coordinator.calls(),
            vec![
                RecordedCall::Grant { ttl_secs: 10 },
                RecordedCall::Put {
                    key: b"/services/backend/h1".to_vec(),
                    value: b"10.0.0.5:8080".to_vec(),
                    lease_id: LeaseId::new(42),
                },
                RecordedCall::Renew { lease_id: LeaseId::new(42) },
                RecordedCall::Renew { lease_id: LeaseId::new(42) },
            ]
        );
    }

    #[tokio::test]
    async fn test_run_aborts_when_registration_fails() {
        let coordinator = Arc::new(
            ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10))
                .with_put_reply(Reply::Unreachable),
        );

        let err = build(coordinator.clone()).run().await.unwrap_err();

        assert!(matches!(err, TetherError::RegistrationFailed(_)));
        assert_eq!(coordinator.renewal_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_cleanly() {
        let coordinator = Arc::new(ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10)));
        let tether = build(coordinator.clone());
        let shutdown = tether.shutdown_handle();

        let handle = tokio::spawn(tether.run());
        tokio::time::sleep(Duration::from_secs(11)).await;
        shutdown.send(()).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert_eq!(coordinator.renewal_count(), 2);
    }
}
