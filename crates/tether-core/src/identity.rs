use std::net::IpAddr;

use crate::config::ServiceConfig;
use crate::error::{Result, TetherError};

/// Who this instance is and where it can be reached.
///
/// Built once at startup and handed by value to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Stable instance name, usually the OS hostname.
    pub hostname: String,
    /// Address other parties dial.
    pub host: String,
    /// Service port.
    pub port: u16,
    /// Registration key, `<prefix><hostname>`.
    pub key: String,
    /// Registration value, `<host>:<port>`.
    pub value: String,
}

impl ServiceIdentity {
    /// Build an identity from already-known parts.
    pub fn new(hostname: impl Into<String>, host: impl Into<String>, port: u16, prefix: &str) -> Self {
        let hostname = hostname.into();
        let host = host.into();
        let key = registration_key(prefix, &hostname);
        let value = advertised_address(&host, port);
        Self {
            hostname,
            host,
            port,
            key,
            value,
        }
    }

    /// Resolve the identity from configuration, the OS hostname and DNS.
    pub async fn resolve(config: &ServiceConfig) -> Result<Self> {
        let hostname = match &config.hostname {
            Some(name) => name.clone(),
            None => hostname::get()
                .map_err(|e| TetherError::Config(format!("Failed to read hostname: {}", e)))?
                .to_string_lossy()
                .to_string(),
        };

        let host = match &config.advertise_addr {
            Some(addr) => addr.clone(),
            None => resolve_host(&hostname, config.port).await?.to_string(),
        };

        Ok(Self::new(hostname, host, config.port, &config.key_prefix))
    }
}

/// Join the key prefix and instance name.
pub fn registration_key(prefix: &str, hostname: &str) -> String {
    if prefix.ends_with('/') {
        format!("{}{}", prefix, hostname)
    } else {
        format!("{}/{}", prefix, hostname)
    }
}

fn advertised_address(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{}]:{}", v6, port),
        _ => format!("{}:{}", host, port),
    }
}

/// Resolve a hostname, preferring IPv4.
async fn resolve_host(hostname: &str, port: u16) -> Result<IpAddr> {
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((hostname, port))
        .await
        .map_err(|e| TetherError::Config(format!("Failed to resolve {}: {}", hostname, e)))?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TetherError::Config(format!("No addresses found for {}", hostname)))
}
