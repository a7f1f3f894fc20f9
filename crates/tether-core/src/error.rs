use thiserror::Error;

use crate::lease::{LeaseId, Rpc};

/// Core error type for tether operations.
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Coordinator unreachable: {rpc} failed on all {attempts} endpoint(s), last error: {source}")]
    CoordinatorUnreachable {
        rpc: Rpc,
        attempts: usize,
        #[source]
        source: EndpointError,
    },

    #[error("Registration failed: {0}")]
    RegistrationFailed(#[source] Box<TetherError>),

    #[error("Renewal of lease {lease_id} failed: {source}")]
    RenewalFailed {
        lease_id: LeaseId,
        #[source]
        source: Box<TetherError>,
    },

    #[error("Lease {0} is no longer known to the coordinator")]
    LeaseExpired(LeaseId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Wrap a startup failure.
    pub fn registration(cause: TetherError) -> Self {
        Self::RegistrationFailed(Box::new(cause))
    }

    /// Wrap a keepalive tick failure for the given lease.
    pub fn renewal(lease_id: LeaseId, cause: TetherError) -> Self {
        Self::RenewalFailed {
            lease_id,
            source: Box::new(cause),
        }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(e: serde_json::Error) -> Self {
        TetherError::Serialization(e.to_string())
    }
}

/// Failure of a single request against one coordinator endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("{endpoint}: request timed out")]
    Timeout { endpoint: String },

    #[error("{endpoint}: transport error: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint}: HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint}: coordinator returned an error: {message}")]
    Rejected { endpoint: String, message: String },

    #[error("{endpoint}: malformed response: {message}")]
    Malformed { endpoint: String, message: String },
}

impl EndpointError {
    /// The endpoint this failure was observed on.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Timeout { endpoint }
            | Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Rejected { endpoint, .. }
            | Self::Malformed { endpoint, .. } => endpoint,
        }
    }
}

/// Result type alias using TetherError.
pub type Result<T> = std::result::Result<T, TetherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_message_names_last_endpoint() {
        let err = TetherError::CoordinatorUnreachable {
            rpc: Rpc::RenewLease,
            attempts: 3,
            source: EndpointError::Timeout {
                endpoint: "http://etcd3:2379".to_string(),
            },
        };

        let msg = err.to_string();
        assert!(msg.contains("RenewLease"));
        assert!(msg.contains("all 3 endpoint(s)"));
        assert!(msg.contains("http://etcd3:2379"));
    }

    #[test]
    fn test_renewal_failure_keeps_cause() {
        let err = TetherError::renewal(LeaseId::new(42), TetherError::LeaseExpired(LeaseId::new(42)));
        assert!(matches!(err, TetherError::RenewalFailed { lease_id, .. } if lease_id == LeaseId::new(42)));

        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("Lease 42 is no longer known to the coordinator")
        );
    }

    #[test]
    fn test_endpoint_error_endpoint() {
        let err = EndpointError::Status {
            endpoint: "http://a".into(),
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.endpoint(), "http://a");
    }
}
