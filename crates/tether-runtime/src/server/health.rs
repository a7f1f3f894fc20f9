use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use tether_core::ServiceIdentity;

use crate::registration::RegistrationStatus;

/// State shared by the HTTP handlers.
#[derive(Clone)]
pub struct ServerState {
    pub identity: ServiceIdentity,
    pub status: Arc<RegistrationStatus>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub hostname: String,
    pub key: String,
    pub value: String,
    pub lease_id: String,
    pub granted_ttl_secs: i64,
    pub ttl_secs: i64,
    pub keepalive: String,
    pub renewals: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_renewed_at: Option<DateTime<Utc>>,
    pub version: String,
}

/// Greeting served on `/`.
pub(super) async fn hello_handler(State(state): State<Arc<ServerState>>) -> String {
    format!("Hello from {}\n", state.identity.hostname)
}

/// Health check handler; 503 once the registration is no longer renewed.
pub(super) async fn health_handler(
    State(state): State<Arc<ServerState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let status = &state.status;
    let healthy = status.is_healthy();

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        hostname: state.identity.hostname.clone(),
        key: state.identity.key.clone(),
        value: state.identity.value.clone(),
        lease_id: status.lease_id().to_string(),
        granted_ttl_secs: status.granted_ttl_secs(),
        ttl_secs: status.remaining_ttl_secs(),
        keepalive: status.state().as_str().to_string(),
        renewals: status.renewals(),
        last_renewed_at: status.last_renewed_at(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body))
}
