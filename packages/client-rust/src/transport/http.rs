//! HTTP transport backed by a pooled `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::HeaderMap;
use reqwest::{Certificate, Url};
use tracing::debug;
use wirecall_core::WireCodec;

use super::{duration_ms, OutboundCall, Transport, TransportError};
use crate::config::{ClientConfig, ConfigError, Credentials};

/// Header carrying the operation's action URI.
pub const ACTION_HEADER: &str = "x-wirecall-action";
/// Header carrying the request's message id.
pub const MESSAGE_ID_HEADER: &str = "x-wirecall-message-id";

/// POSTs envelopes to the endpoint over HTTP(S).
///
/// The underlying connection pool is shared by every call made through this
/// transport (and through its clones). Non-2xx replies are handed back only
/// when they carry an envelope, since services report faults on error
/// statuses; anything else (a proxy's error page) is `TransportError::Status`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Build a transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the CA certificate cannot be read or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone());

        if let Some(tls) = &config.tls {
            if let Some(path) = &tls.ca_cert_path {
                let pem = std::fs::read(path).map_err(|source| ConfigError::CaCertificate {
                    path: path.clone(),
                    source,
                })?;
                builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
            }
            builder = builder.danger_accept_invalid_certs(tls.accept_invalid_certs);
        }

        Ok(Self {
            http: builder.build()?,
            credentials: config.credentials.clone(),
        })
    }

    /// Wraps an existing client, e.g. one shared with other parts of the host.
    #[must_use]
    pub fn from_client(http: reqwest::Client, credentials: Option<Credentials>) -> Self {
        Self { http, credentials }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &Url,
        call: OutboundCall,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let mut request = self
            .http
            .post(endpoint.clone())
            .timeout(timeout)
            .header(CONTENT_TYPE, call.content_type)
            .header(ACCEPT, call.content_type)
            .header(ACTION_HEADER, call.action.as_str())
            .header(MESSAGE_ID_HEADER, call.message_id.as_str())
            .body(call.body);

        request = match &self.credentials {
            Some(Credentials::Bearer { token }) => request.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| classify(err, timeout))?;
        let status = response.status();
        let msgpack = is_msgpack(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|err| classify(err, timeout))?;

        debug!(
            action = %call.action,
            status = status.as_u16(),
            bytes = body.len(),
            "exchange reply received"
        );

        if !status.is_success() && !(msgpack || WireCodec.is_envelope(&body)) {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(body)
    }
}

fn is_msgpack(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(wirecall_core::CONTENT_TYPE))
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            timeout_ms: duration_ms(timeout),
        }
    } else {
        TransportError::connect(err)
    }
}
