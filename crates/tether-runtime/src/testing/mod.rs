//! Scripted coordinator for exercising the registration state machine
//! without a coordination store.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use tether_core::{
    Coordinator, CoordinatorFuture, EndpointError, Lease, LeaseId, Rpc, TetherError,
};

/// Scripted outcome of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Succeed.
    Ok,
    /// Fail as if every endpoint was down.
    Unreachable,
    /// Renewal answers with TTL 0, the lease is gone.
    LeaseGone,
}

/// A call as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Grant {
        ttl_secs: u64,
    },
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        lease_id: LeaseId,
    },
    Renew {
        lease_id: LeaseId,
    },
}

/// Coordinator returning scripted replies and recording every call.
///
/// Renewals follow the queued script and succeed once it runs out.
pub struct ScriptedCoordinator {
    grant: Mutex<Lease>,
    grant_reply: Reply,
    put_reply: Reply,
    renew_script: Mutex<VecDeque<Reply>>,
    renew_delay: Duration,
    calls: Mutex<Vec<RecordedCall>>,
    renewed_at: Mutex<Vec<Instant>>,
    reset_at: Mutex<Vec<Instant>>,
}

impl ScriptedCoordinator {
    /// A coordinator that grants `lease` and accepts everything.
    pub fn granting(lease: Lease) -> Self {
        Self {
            grant: Mutex::new(lease),
            grant_reply: Reply::Ok,
            put_reply: Reply::Ok,
            renew_script: Mutex::new(VecDeque::new()),
            renew_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            renewed_at: Mutex::new(Vec::new()),
            reset_at: Mutex::new(Vec::new()),
        }
    }

    pub fn with_grant_reply(mut self, reply: Reply) -> Self {
        self.grant_reply = reply;
        self
    }

    pub fn with_put_reply(mut self, reply: Reply) -> Self {
        self.put_reply = reply;
        self
    }

    /// Make every renewal take `delay` before answering.
    pub fn with_renew_delay(mut self, delay: Duration) -> Self {
        self.renew_delay = delay;
        self
    }

    /// Queue replies for the next renewals.
    pub fn with_renewals(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.renew_script.lock().unwrap().extend(replies);
        self
    }

    /// Change the lease handed out by the next grant.
    pub fn set_grant(&self, lease: Lease) {
        *self.grant.lock().unwrap() = lease;
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of renewal attempts so far.
    pub fn renewal_count(&self) -> usize {
        self.renewed_at.lock().unwrap().len()
    }

    /// Instants at which renewals were attempted.
    pub fn renewal_times(&self) -> Vec<Instant> {
        self.renewed_at.lock().unwrap().clone()
    }

    /// Instants at which successful renewals answered, i.e. when the lease
    /// countdown was reset.
    pub fn renewal_completions(&self) -> Vec<Instant> {
        self.reset_at.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unreachable(rpc: Rpc) -> TetherError {
    TetherError::CoordinatorUnreachable {
        rpc,
        attempts: 1,
        source: EndpointError::Transport {
            endpoint: "scripted".to_string(),
            message: "connection refused".to_string(),
        },
    }
}

impl Coordinator for ScriptedCoordinator {
    fn grant_lease(&self, ttl_secs: u64) -> CoordinatorFuture<'_, Lease> {
        self.record(RecordedCall::Grant { ttl_secs });
        let lease = *self.grant.lock().unwrap();
        let reply = self.grant_reply;
        Box::pin(async move {
            match reply {
                Reply::Ok => Ok(lease),
                _ => Err(unreachable(Rpc::GrantLease)),
            }
        })
    }

    fn put_key<'a>(
        &'a self,
        key: &'a [u8],
        value: &'a [u8],
        lease_id: LeaseId,
    ) -> CoordinatorFuture<'a, ()> {
        self.record(RecordedCall::Put {
            key: key.to_vec(),
            value: value.to_vec(),
            lease_id,
        });
        let reply = self.put_reply;
        Box::pin(async move {
            match reply {
                Reply::Ok => Ok(()),
                _ => Err(unreachable(Rpc::PutKey)),
            }
        })
    }

    fn renew_lease(&self, lease_id: LeaseId) -> CoordinatorFuture<'_, Lease> {
        self.record(RecordedCall::Renew { lease_id });
        self.renewed_at.lock().unwrap().push(Instant::now());
        let reply = self
            .renew_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Ok);
        let ttl = self.grant.lock().unwrap().ttl_secs;
        let delay = self.renew_delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Ok => {
                    self.reset_at.lock().unwrap().push(Instant::now());
                    Ok(Lease::new(lease_id, ttl))
                }
                Reply::LeaseGone => Ok(Lease::new(lease_id, 0)),
                Reply::Unreachable => Err(unreachable(Rpc::RenewLease)),
            }
        })
    }
}
