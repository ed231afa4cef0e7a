//! Client and stub-endpoint configuration.
//!
//! All configuration is fixed at construction; nothing here can be changed
//! per call.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

/// Errors raised while validating configuration or building a transport.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    #[error("failed to read CA certificate {}: {source}", .path.display())]
    CaCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for a `Client`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint every envelope is POSTed to.
    pub endpoint: String,
    /// Maximum time to wait for a complete reply.
    pub request_timeout: Duration,
    /// Maximum time to establish a connection.
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout: Duration,
    /// Upper bound on idle pooled connections per host.
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Optional TLS settings.
    pub tls: Option<TlsConfig>,
    /// Optional credentials attached to every request.
    pub credentials: Option<Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            user_agent: concat!("wirecall/", env!("CARGO_PKG_VERSION")).to_string(),
            tls: None,
            credentials: None,
        }
    }
}

impl ClientConfig {
    /// Convenience constructor: defaults with the given endpoint.
    #[must_use]
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Check the configuration and return the parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` for an unparsable or non-HTTP
    /// endpoint and `ConfigError::ZeroTimeout` for a zero timeout.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let url = Url::parse(&self.endpoint).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "request_timeout",
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                field: "connect_timeout",
            });
        }
        Ok(url)
    }
}

/// TLS settings for HTTPS endpoints.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Extra PEM root certificate to trust (e.g. a private CA).
    pub ca_cert_path: Option<PathBuf>,
    /// Skip certificate verification. Test environments only.
    pub accept_invalid_certs: bool,
}

/// Credentials attached to every outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// StubConfig
// ---------------------------------------------------------------------------

/// Configuration for the in-process stub endpoint.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Bind address.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// When set, requests must carry `Authorization: Bearer <token>`.
    pub required_token: Option<String>,
    /// Artificial delay before every reply.
    pub latency: Duration,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            required_token: None,
            latency: Duration::ZERO,
        }
    }
}
