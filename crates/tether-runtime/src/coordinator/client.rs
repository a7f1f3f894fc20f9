use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use tether_core::config::CoordinatorConfig;
use tether_core::{
    Coordinator, CoordinatorFuture, EndpointError, Lease, LeaseId, Result, Rpc, TetherError,
};

use super::wire::{self, GrantRequest, KeepaliveRequest, KeepaliveResponse, PutRequest, PutResponse};

/// Longest error body kept in an [`EndpointError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// etcd v3 gateway client with ordered endpoint fallback.
///
/// Every call walks the endpoint list in configured order and returns the
/// first success. Each attempt is bounded by the request timeout and is never
/// retried on the same endpoint.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl CoordinatorClient {
    /// Create a client for the given endpoints.
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(TetherError::Config(
                "At least one coordinator endpoint is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TetherError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let endpoints = endpoints
            .into_iter()
            .map(|e| e.trim_end_matches('/').to_string())
            .collect();

        Ok(Self {
            http,
            endpoints,
            timeout,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self> {
        Self::new(config.endpoints.clone(), config.request_timeout())
    }

    /// Configured endpoints, in the order they are tried.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform an RPC against the first endpoint that answers successfully.
    async fn call<B, T>(&self, rpc: Rpc, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            match self.attempt(endpoint, rpc, body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    tracing::warn!("{} failed: {}", rpc, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(source) => Err(TetherError::CoordinatorUnreachable {
                rpc,
                attempts: self.endpoints.len(),
                source,
            }),
            None => Err(TetherError::Internal(format!(
                "{} attempted with no endpoints",
                rpc
            ))),
        }
    }

    /// One request against one endpoint.
    async fn attempt<B, T>(&self, endpoint: &str, rpc: Rpc, body: &B) -> std::result::Result<T, EndpointError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", endpoint, wire::path(rpc));

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if !status.is_success() {
            return Err(EndpointError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        let value = wire::first_document(&text).map_err(|e| EndpointError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        if let Some(message) = wire::embedded_error(&value) {
            return Err(EndpointError::Rejected {
                endpoint: endpoint.to_string(),
                message,
            });
        }

        serde_json::from_value(value).map_err(|e| EndpointError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

impl Coordinator for CoordinatorClient {
    fn grant_lease(&self, ttl_secs: u64) -> CoordinatorFuture<'_, Lease> {
        Box::pin(async move {
            let lease: Lease = self
                .call(Rpc::GrantLease, &GrantRequest { ttl: ttl_secs })
                .await?;
            tracing::debug!("Granted lease {} (TTL={}s)", lease.id, lease.ttl_secs);
            Ok(lease)
        })
    }

    fn put_key<'a>(
        &'a self,
        key: &'a [u8],
        value: &'a [u8],
        lease_id: LeaseId,
    ) -> CoordinatorFuture<'a, ()> {
        Box::pin(async move {
            let _: PutResponse = self
                .call(Rpc::PutKey, &PutRequest::new(key, value, lease_id))
                .await?;
            Ok(())
        })
    }

    fn renew_lease(&self, lease_id: LeaseId) -> CoordinatorFuture<'_, Lease> {
        Box::pin(async move {
            let resp: KeepaliveResponse = self
                .call(Rpc::RenewLease, &KeepaliveRequest { id: lease_id })
                .await?;
            Ok(resp.result)
        })
    }
}

fn transport_error(endpoint: &str, e: reqwest::Error) -> EndpointError {
    if e.is_timeout() {
        EndpointError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        EndpointError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
