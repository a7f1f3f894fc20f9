//! JSON bodies exchanged with the etcd v3 gateway.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tether_core::{Lease, LeaseId, Rpc};

/// Gateway path for an RPC.
pub fn path(rpc: Rpc) -> &'static str {
    match rpc {
        Rpc::GrantLease => "/v3/lease/grant",
        Rpc::PutKey => "/v3/kv/put",
        Rpc::RenewLease => "/v3/lease/keepalive",
    }
}

#[derive(Debug, Serialize)]
pub struct GrantRequest {
    #[serde(rename = "TTL")]
    pub ttl: u64,
}

#[derive(Debug, Serialize)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
    pub lease: LeaseId,
}

impl PutRequest {
    pub fn new(key: &[u8], value: &[u8], lease: LeaseId) -> Self {
        Self {
            key: STANDARD.encode(key),
            value: STANDARD.encode(value),
            lease,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeepaliveRequest {
    #[serde(rename = "ID")]
    pub id: LeaseId,
}

/// Keepalive is a streaming RPC; each message wraps the lease in `result`.
#[derive(Debug, Deserialize)]
pub struct KeepaliveResponse {
    pub result: Lease,
}

/// Put responses only carry a header.
#[derive(Debug, Deserialize)]
pub struct PutResponse {}

/// Error reported inside a 2xx body, if any.
///
/// Lease grants carry an `error` string and streamed responses an `error`
/// object; both are empty or absent on success.
pub fn embedded_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => Some(
            obj.get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        ),
        _ => None,
    }
}

/// First JSON document of a possibly newline-delimited body.
pub fn first_document(text: &str) -> Result<Value, serde_json::Error> {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    serde_json::from_str(line)
}
