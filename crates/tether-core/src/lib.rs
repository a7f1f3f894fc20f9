pub mod config;
pub mod error;
pub mod identity;
pub mod lease;

pub use config::TetherConfig;
pub use error::{EndpointError, Result, TetherError};
pub use identity::ServiceIdentity;
pub use lease::{Coordinator, CoordinatorFuture, Lease, LeaseId, Rpc};
