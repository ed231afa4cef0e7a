//! Stub endpoint: an axum server that speaks the envelope protocol and
//! emulates a small EC2 surface.
//!
//! Follows a deferred startup lifecycle: `new()` builds state, `start()`
//! binds the listener (port 0 picks an ephemeral port) and `serve()` accepts
//! connections until the shutdown future resolves.

pub mod ec2;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use wirecall_core::ec2::faults::AUTH_FAILURE;
use wirecall_core::ec2::AuthFailure;
use wirecall_core::{OperationRegistry, RequestEnvelope, WireCodec};

pub use self::ec2::{Ec2Service, StubFault};
use crate::config::StubConfig;
use crate::transport::http::ACTION_HEADER;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct StubState {
    pub registry: Arc<OperationRegistry>,
    pub service: Arc<Ec2Service>,
    pub required_token: Option<Arc<str>>,
    pub latency: Duration,
}

/// Lifecycle wrapper around the stub's axum server.
pub struct StubEndpoint {
    config: StubConfig,
    listener: Option<TcpListener>,
    registry: Arc<OperationRegistry>,
    service: Arc<Ec2Service>,
}

impl StubEndpoint {
    /// Creates the endpoint without binding any port.
    ///
    /// # Errors
    ///
    /// Returns an error if the EC2 operation catalog fails to register.
    pub fn new(config: StubConfig) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            listener: None,
            registry: Arc::new(wirecall_core::ec2::registry()?),
            service: Arc::new(Ec2Service::default()),
        })
    }

    /// Shared handle to the emulated service, e.g. to inspect fleet state.
    #[must_use]
    pub fn service(&self) -> Arc<Ec2Service> {
        Arc::clone(&self.service)
    }

    /// Routes:
    /// - `POST /` -- envelope endpoint (`MsgPack`)
    /// - `GET /health/live` -- liveness probe
    pub fn build_router(&self) -> Router {
        let state = StubState {
            registry: Arc::clone(&self.registry),
            service: Arc::clone(&self.service),
            required_token: self.config.required_token.as_deref().map(Arc::from),
            latency: self.config.latency,
        };

        Router::new()
            .route("/", post(envelope_handler))
            .route("/health/live", get(liveness_handler))
            .with_state(state)
    }

    /// Binds the TCP listener and returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local = listener.local_addr()?;

        info!(%local, "stub endpoint listening");

        self.listener = Some(listener);
        Ok(local)
    }

    /// Serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("stub endpoint stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Liveness probe: 200 while the process is up.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Decodes a request envelope, dispatches it and answers with a reply or a
/// fault envelope.
pub async fn envelope_handler(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }

    let codec = WireCodec;
    let request = match codec.decode_request(&body) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = %err, "rejecting malformed request");
            return fault_response(
                None,
                StubFault::new(StatusCode::BAD_REQUEST, "MalformedRequest", err.to_string()),
            );
        }
    };

    match dispatch(&state, &headers, &request) {
        Ok(reply) => msgpack(StatusCode::OK, reply),
        Err(fault) => {
            debug!(
                operation = %request.operation,
                code = %fault.fault.code,
                status = fault.status.as_u16(),
                "answering with fault"
            );
            fault_response(Some(&request), fault)
        }
    }
}

fn dispatch(
    state: &StubState,
    headers: &HeaderMap,
    request: &RequestEnvelope<rmpv::Value>,
) -> Result<Bytes, StubFault> {
    if let Some(token) = &state.required_token {
        let expected = format!("Bearer {token}");
        let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(StubFault::new(
                StatusCode::UNAUTHORIZED,
                AUTH_FAILURE,
                "AWS was not able to validate the provided access credentials",
            )
            .with_detail(&AuthFailure::default()));
        }
    }

    if let Some(header) = headers.get(ACTION_HEADER).and_then(|v| v.to_str().ok()) {
        if header != request.action {
            return Err(StubFault::new(
                StatusCode::BAD_REQUEST,
                "InvalidAction",
                format!("Action header {header} does not match envelope action {}", request.action),
            ));
        }
    }

    let descriptor = state.registry.resolve_action(&request.action).map_err(|_| {
        StubFault::new(
            StatusCode::BAD_REQUEST,
            "InvalidAction",
            format!("The action {} is not valid for this web service.", request.action),
        )
    })?;

    state.service.handle(descriptor.name(), request)
}

fn fault_response(request: Option<&RequestEnvelope<rmpv::Value>>, fault: StubFault) -> Response {
    let codec = WireCodec;
    let status = fault.status;
    let encoded = match request {
        Some(request) => codec.fault_to(request, fault.fault),
        None => codec.encode_fault(fault.fault),
    };
    match encoded {
        Ok(bytes) => msgpack(status, bytes),
        Err(err) => {
            warn!(error = %err, "failed to encode fault envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn msgpack(status: StatusCode, body: Bytes) -> Response {
    (status, [(CONTENT_TYPE, wirecall_core::CONTENT_TYPE)], body).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
