mod id;
mod traits;

pub use id::{Lease, LeaseId};
pub use traits::{Coordinator, CoordinatorFuture};

/// RPCs the registration protocol issues against the coordination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rpc {
    /// Request a new lease with a TTL.
    GrantLease,
    /// Attach a key/value pair to a lease.
    PutKey,
    /// Reset a lease's expiration countdown.
    RenewLease,
}

impl Rpc {
    /// Name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrantLease => "GrantLease",
            Self::PutKey => "PutKey",
            Self::RenewLease => "RenewLease",
        }
    }
}

impl std::fmt::Display for Rpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
