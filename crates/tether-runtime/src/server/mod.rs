mod health;
mod http;

pub use health::{HealthResponse, ServerState};
pub use http::{HttpServer, ServerConfig};
