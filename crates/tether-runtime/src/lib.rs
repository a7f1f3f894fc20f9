pub mod coordinator;
pub mod registration;
pub mod server;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use coordinator::CoordinatorClient;
pub use registration::{
    KeepaliveConfig, KeepaliveScheduler, KeepaliveState, LeaseManager, RegistrationStatus,
};
pub use server::{HttpServer, ServerConfig, ServerState};
