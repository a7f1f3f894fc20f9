use std::sync::Arc;

use tether_core::{Coordinator, Lease, TetherError};

/// One-shot startup sequence: grant a lease, then register under it.
pub struct LeaseManager {
    coordinator: Arc<dyn Coordinator>,
}

impl LeaseManager {
    /// Create a new lease manager.
    pub fn new(coordinator: Arc<dyn Coordinator>) -> Self {
        Self { coordinator }
    }

    /// The coordinator this manager registers with.
    pub fn coordinator(&self) -> Arc<dyn Coordinator> {
        self.coordinator.clone()
    }

    /// Grant a lease of `ttl_secs` and attach `key -> value` to it.
    ///
    /// Returns the granted lease. Any failure is a `RegistrationFailed`;
    /// nothing is retried and no partial state is kept, so the caller is
    /// expected to abort startup.
    pub async fn start(&self, ttl_secs: u64, key: &[u8], value: &[u8]) -> tether_core::Result<Lease> {
        if ttl_secs == 0 {
            return Err(TetherError::registration(TetherError::InvalidArgument(
                "lease TTL must be positive".to_string(),
            )));
        }

        let lease = self
            .coordinator
            .grant_lease(ttl_secs)
            .await
            .map_err(TetherError::registration)?;

        tracing::info!("Lease {} granted (TTL={}s)", lease.id, lease.ttl_secs);

        self.coordinator
            .put_key(key, value, lease.id)
            .await
            .map_err(TetherError::registration)?;

        tracing::info!(
            "Registered {} -> {} under lease {}",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value),
            lease.id
        );

        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordedCall, Reply, ScriptedCoordinator};
    use tether_core::LeaseId;

    #[tokio::test]
    async fn test_put_uses_granted_lease_id() {
        let coordinator = Arc::new(ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10)));
        let manager = LeaseManager::new(coordinator.clone());

        let lease = manager
            .start(10, b"/services/backend/h1", b"10.0.0.5:8080")
            .await
            .unwrap();

        assert_eq!(lease.id, LeaseId::new(42));
        assert_eq!(
            coordinator.calls(),
            vec![
                RecordedCall::Grant { ttl_secs: 10 },
                RecordedCall::Put {
                    key: b"/services/backend/h1".to_vec(),
                    value: b"10.0.0.5:8080".to_vec(),
                    lease_id: LeaseId::new(42),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_each_start_uses_its_own_grant() {
        let coordinator = Arc::new(ScriptedCoordinator::granting(Lease::new(LeaseId::new(1), 10)));
        let manager = LeaseManager::new(coordinator.clone());
        manager.start(10, b"k", b"v").await.unwrap();

        coordinator.set_grant(Lease::new(LeaseId::new(2), 10));
        manager.start(10, b"k", b"v").await.unwrap();

        let put_ids: Vec<LeaseId> = coordinator
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Put { lease_id, .. } => Some(lease_id),
                _ => None,
            })
            .collect();
        assert_eq!(put_ids, vec![LeaseId::new(1), LeaseId::new(2)]);
    }

    #[tokio::test]
    async fn test_grant_failure_skips_put() {
        let coordinator = Arc::new(
            ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10))
                .with_grant_reply(Reply::Unreachable),
        );
        let manager = LeaseManager::new(coordinator.clone());

        let err = manager.start(10, b"k", b"v").await.unwrap_err();

        match err {
            TetherError::RegistrationFailed(cause) => {
                assert!(matches!(*cause, TetherError::CoordinatorUnreachable { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(coordinator.calls(), vec![RecordedCall::Grant { ttl_secs: 10 }]);
    }

    #[tokio::test]
    async fn test_put_failure_is_registration_failure() {
        let coordinator = Arc::new(
            ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10))
                .with_put_reply(Reply::Unreachable),
        );
        let manager = LeaseManager::new(coordinator.clone());

        let err = manager.start(10, b"k", b"v").await.unwrap_err();

        assert!(matches!(err, TetherError::RegistrationFailed(_)));
        assert_eq!(coordinator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected_without_calls() {
        let coordinator = Arc::new(ScriptedCoordinator::granting(Lease::new(LeaseId::new(42), 10)));
        let manager = LeaseManager::new(coordinator.clone());

        let err = manager.start(0, b"k", b"v").await.unwrap_err();

        assert!(matches!(err, TetherError::RegistrationFailed(_)));
        assert!(coordinator.calls().is_empty());
    }
}
