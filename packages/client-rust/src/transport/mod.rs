//! Transport invoker: one request/response exchange with a remote endpoint.
//!
//! Transports never retry and never hand back partial replies; a reply is
//! either fully received or the exchange fails.

pub mod http;
pub mod mock;

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

pub use http::HttpTransport;
pub use mock::{EchoTransport, ScriptedTransport, StalledTransport};

/// Boxed cause of a transport failure.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An encoded envelope on its way to the endpoint.
#[derive(Debug, Clone)]
pub struct OutboundCall {
    /// Action URI of the operation, also sent out-of-band (header) so
    /// intermediaries can route without decoding the body.
    pub action: String,
    pub message_id: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// Errors raised while exchanging bytes with the endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport failure: {cause}")]
    Connect {
        #[source]
        cause: BoxError,
    },
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Error status whose body is not a protocol reply, e.g. a proxy's
    /// error page.
    #[error("endpoint answered {status} without an envelope")]
    Status { status: u16 },
}

impl TransportError {
    /// Wraps any error as a connection-level failure.
    pub fn connect(cause: impl Into<BoxError>) -> Self {
        Self::Connect {
            cause: cause.into(),
        }
    }

    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: duration_ms(timeout),
        }
    }
}

/// A single blocking-from-the-caller's-view exchange.
///
/// Implementations may pool connections, but must treat each call as a fresh,
/// independent exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `call` to `endpoint` and return the complete reply body.
    async fn send(
        &self,
        endpoint: &Url,
        call: OutboundCall,
        timeout: Duration,
    ) -> Result<Bytes, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        endpoint: &Url,
        call: OutboundCall,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        (**self).send(endpoint, call, timeout).await
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
