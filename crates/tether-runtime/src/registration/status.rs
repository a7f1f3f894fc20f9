use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use chrono::{DateTime, Utc};

use tether_core::{Lease, LeaseId};

/// Keepalive state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveState {
    /// Lease is being renewed.
    Running,
    /// A renewal failed; the lease can no longer be trusted.
    Failed,
    /// Stopped through the shutdown signal.
    Stopped,
}

impl KeepaliveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Failed => 1,
            Self::Stopped => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Failed,
        }
    }
}

/// Observable registration state, written only by the keepalive task.
#[derive(Debug)]
pub struct RegistrationStatus {
    lease_id: LeaseId,
    granted_ttl_secs: i64,
    state: AtomicU8,
    renewals: AtomicU64,
    remaining_ttl_secs: AtomicI64,
    /// Unix millis of the last successful renewal, 0 if none yet.
    last_renewed_ms: AtomicI64,
}

impl RegistrationStatus {
    /// Status for a freshly granted lease.
    pub fn new(lease: Lease) -> Self {
        Self {
            lease_id: lease.id,
            granted_ttl_secs: lease.ttl_secs,
            state: AtomicU8::new(KeepaliveState::Running.to_u8()),
            renewals: AtomicU64::new(0),
            remaining_ttl_secs: AtomicI64::new(lease.ttl_secs),
            last_renewed_ms: AtomicI64::new(0),
        }
    }

    pub fn lease_id(&self) -> LeaseId {
        self.lease_id
    }

    /// TTL the coordinator granted.
    pub fn granted_ttl_secs(&self) -> i64 {
        self.granted_ttl_secs
    }

    /// TTL reported by the latest renewal.
    pub fn remaining_ttl_secs(&self) -> i64 {
        self.remaining_ttl_secs.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> KeepaliveState {
        KeepaliveState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the instance is registered and renewing.
    pub fn is_healthy(&self) -> bool {
        self.state() == KeepaliveState::Running
    }

    /// Successful renewals so far.
    pub fn renewals(&self) -> u64 {
        self.renewals.load(Ordering::SeqCst)
    }

    pub fn last_renewed_at(&self) -> Option<DateTime<Utc>> {
        match self.last_renewed_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    pub(crate) fn record_renewal(&self, ttl_secs: i64) {
        self.remaining_ttl_secs.store(ttl_secs, Ordering::SeqCst);
        self.last_renewed_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
        self.renewals.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn set_state(&self, state: KeepaliveState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status_is_running() {
        let status = RegistrationStatus::new(Lease::new(LeaseId::new(7), 10));
        assert_eq!(status.state(), KeepaliveState::Running);
        assert!(status.is_healthy());
        assert_eq!(status.renewals(), 0);
        assert_eq!(status.last_renewed_at(), None);
        assert_eq!(status.granted_ttl_secs(), 10);
    }

    #[test]
    fn test_record_renewal() {
        let status = RegistrationStatus::new(Lease::new(LeaseId::new(7), 10));
        status.record_renewal(9);
        assert_eq!(status.renewals(), 1);
        assert_eq!(status.remaining_ttl_secs(), 9);
        assert!(status.last_renewed_at().is_some());
    }

    #[test]
    fn test_failed_is_unhealthy() {
        let status = RegistrationStatus::new(Lease::new(LeaseId::new(7), 10));
        status.set_state(KeepaliveState::Failed);
        assert!(!status.is_healthy());
        assert_eq!(status.state().as_str(), "failed");
    }
}
