use std::future::Future;
use std::pin::Pin;

use super::id::{Lease, LeaseId};
use crate::error::Result;

/// Boxed future returned by [`Coordinator`] calls.
pub type CoordinatorFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The RPC surface of the coordination store used for self-registration.
///
/// Implementations are stateless between calls. A failure means no
/// reachable endpoint served the request.
pub trait Coordinator: Send + Sync {
    /// Request a new lease with the given TTL.
    fn grant_lease(&self, ttl_secs: u64) -> CoordinatorFuture<'_, Lease>;

    /// Associate `key` with `value` under `lease_id`.
    fn put_key<'a>(
        &'a self,
        key: &'a [u8],
        value: &'a [u8],
        lease_id: LeaseId,
    ) -> CoordinatorFuture<'a, ()>;

    /// Refresh the TTL countdown of a lease, returning the lease as the
    /// coordinator now reports it.
    fn renew_lease(&self, lease_id: LeaseId) -> CoordinatorFuture<'_, Lease>;
}
