mod keepalive;
mod manager;
mod status;

pub use keepalive::{KeepaliveConfig, KeepaliveScheduler};
pub use manager::LeaseManager;
pub use status::{KeepaliveState, RegistrationStatus};
