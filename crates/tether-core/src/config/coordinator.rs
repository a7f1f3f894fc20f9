use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coordination store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Base URLs, tried in this order for every request.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Timeout for a single request against one endpoint, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl CoordinatorConfig {
    /// Per-attempt request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse a comma-separated endpoint list, dropping empty entries.
    pub fn parse_endpoints(list: &str) -> Vec<String> {
        list.split(',')
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec![
        "http://etcd1:2379".to_string(),
        "http://etcd2:2379".to_string(),
        "http://etcd3:2379".to_string(),
    ]
}

fn default_request_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coordinator_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.endpoints[0], "http://etcd1:2379");
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_endpoints_keeps_order() {
        let endpoints = CoordinatorConfig::parse_endpoints(" http://b:2379/, ,http://a:2379 ");
        assert_eq!(endpoints, vec!["http://b:2379", "http://a:2379"]);
    }
}
