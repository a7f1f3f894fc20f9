//! tether - lease-based self-registration sidecar.
//!
//! Registers this process's address in etcd under a lease, keeps the lease
//! alive at half its TTL, and serves a small hello/health HTTP endpoint.
//! Losing the lease is fatal: [`Tether::run`] returns `RenewalFailed` and the
//! binary exits non-zero.

mod runtime;

#[doc(hidden)]
pub use tether_core;

pub use runtime::{Tether, TetherBuilder};
