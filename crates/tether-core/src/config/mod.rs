mod coordinator;
mod logging;

pub use coordinator::CoordinatorConfig;
pub use logging::LoggingConfig;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetherError};

/// Root configuration for tether.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetherConfig {
    /// Coordination store configuration.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// The registered service.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Lease configuration.
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TetherConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TetherError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content)?;

        toml::from_str(&content)
            .map_err(|e| TetherError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Defaults (or the given file) overlaid with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Defaults (or the given file) overlaid with overrides from `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// Recognised names: `ETCD_ENDPOINTS`, `ETCD_TIMEOUT_MS`, `SERVICE_PORT`,
    /// `SERVICE_PREFIX`, `SERVICE_HOSTNAME`, `ADVERTISE_ADDR`, `LEASE_TTL`,
    /// `LOG_FORMAT`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup("ETCD_ENDPOINTS") {
            self.coordinator.endpoints = CoordinatorConfig::parse_endpoints(&list);
        }
        if let Some(ms) = lookup("ETCD_TIMEOUT_MS") {
            self.coordinator.request_timeout_ms = parse_number("ETCD_TIMEOUT_MS", &ms)?;
        }
        if let Some(port) = lookup("SERVICE_PORT") {
            self.service.port = parse_number("SERVICE_PORT", &port)?;
        }
        if let Some(prefix) = lookup("SERVICE_PREFIX") {
            self.service.key_prefix = prefix;
        }
        if let Some(hostname) = lookup("SERVICE_HOSTNAME").filter(|s| !s.is_empty()) {
            self.service.hostname = Some(hostname);
        }
        if let Some(addr) = lookup("ADVERTISE_ADDR").filter(|s| !s.is_empty()) {
            self.service.advertise_addr = Some(addr);
        }
        if let Some(ttl) = lookup("LEASE_TTL") {
            self.lease.ttl_secs = parse_number("LEASE_TTL", &ttl)?;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }
        Ok(())
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.coordinator.endpoints.is_empty() {
            return Err(TetherError::Config(
                "At least one coordinator endpoint is required".to_string(),
            ));
        }
        for endpoint in &self.coordinator.endpoints {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(TetherError::Config(format!(
                    "Coordinator endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }
        if self.coordinator.request_timeout_ms == 0 {
            return Err(TetherError::Config(
                "Coordinator request timeout must be positive".to_string(),
            ));
        }
        if self.lease.ttl_secs == 0 {
            return Err(TetherError::Config("Lease TTL must be positive".to_string()));
        }
        if !self.service.key_prefix.starts_with('/') {
            return Err(TetherError::Config(format!(
                "Key prefix must start with '/': {}",
                self.service.key_prefix
            )));
        }
        Ok(())
    }
}

/// The service being registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port the service listens on and advertises.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix of the registration key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Instance name; the OS hostname when unset.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Advertised host; resolved from the hostname when unset.
    #[serde(default)]
    pub advertise_addr: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            key_prefix: default_key_prefix(),
            hostname: None,
            advertise_addr: None,
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_key_prefix() -> String {
    "/services/backend/".to_string()
}

/// Lease configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Lease time-to-live in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl LeaseConfig {
    /// Renewal period, half the TTL.
    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.ttl_secs) / 2
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    10
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TetherError::Config(format!("{} must be a number, got {:?}", name, value)))
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TetherError::Internal(e.to_string()))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TetherConfig::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.lease.ttl_secs, 10);
        assert_eq!(config.lease.renew_interval(), Duration::from_secs(5));
        assert_eq!(config.service.key_prefix, "/services/backend/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [coordinator]
            endpoints = ["http://10.0.0.1:2379", "http://10.0.0.2:2379"]
            request_timeout_ms = 500

            [service]
            port = 3000
            key_prefix = "/services/api/"
            hostname = "api-1"

            [lease]
            ttl_secs = 30

            [logging]
            level = "debug"
            json_format = true
        "#;

        let config = TetherConfig::parse_toml(toml).unwrap();
        assert_eq!(config.coordinator.endpoints.len(), 2);
        assert_eq!(config.coordinator.request_timeout_ms, 500);
        assert_eq!(config.service.port, 3000);
        assert_eq!(config.service.hostname.as_deref(), Some("api-1"));
        assert_eq!(config.lease.ttl_secs, 30);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TETHER_TEST_ETCD", "http://etcd-test:2379");

        let toml = r#"
            [coordinator]
            endpoints = ["${TETHER_TEST_ETCD}"]
        "#;

        let config = TetherConfig::parse_toml(toml).unwrap();
        assert_eq!(config.coordinator.endpoints, vec!["http://etcd-test:2379"]);

        std::env::remove_var("TETHER_TEST_ETCD");
    }

    #[test]
    fn test_overrides() {
        let mut config = TetherConfig::default();
        config
            .apply_overrides(env(&[
                ("ETCD_ENDPOINTS", "http://e1:2379,http://e2:2379"),
                ("SERVICE_PORT", "9000"),
                ("LEASE_TTL", "20"),
                ("SERVICE_HOSTNAME", "h1"),
                ("LOG_FORMAT", "JSON"),
            ]))
            .unwrap();

        assert_eq!(
            config.coordinator.endpoints,
            vec!["http://e1:2379", "http://e2:2379"]
        );
        assert_eq!(config.service.port, 9000);
        assert_eq!(config.lease.ttl_secs, 20);
        assert_eq!(config.service.hostname.as_deref(), Some("h1"));
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = TetherConfig::default();
        let err = config
            .apply_overrides(env(&[("SERVICE_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, TetherError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TetherConfig::default();
        config.coordinator.endpoints.clear();
        assert!(config.validate().is_err());

        let mut config = TetherConfig::default();
        config.coordinator.endpoints = vec!["etcd1:2379".to_string()];
        assert!(config.validate().is_err());

        let mut config = TetherConfig::default();
        config.lease.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TetherConfig::default();
        config.service.key_prefix = "services".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_odd_ttl_interval() {
        let lease = LeaseConfig { ttl_secs: 5 };
        assert_eq!(lease.renew_interval(), Duration::from_millis(2500));
    }
}
