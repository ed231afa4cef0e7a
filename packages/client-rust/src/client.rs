//! Client facade: one typed call in, one typed outcome out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::debug;
use uuid::Uuid;
use wirecall_core::{
    CodecError, Decoded, FaultMapper, Operation, OperationDescriptor, OperationRegistry,
    TypeDescriptor, WireCodec,
};

use crate::config::{ClientConfig, ConfigError};
use crate::error::InvokeError;
use crate::service::middleware::metrics::EXCHANGES_TOTAL;
use crate::service::{build_exchange_pipeline, Exchange, ExchangeContext, ExchangePipeline};
use crate::transport::{duration_ms, HttpTransport, Transport};

/// Dispatches typed requests to a remote endpoint.
///
/// A `Client` is `Send + Sync` and meant to be shared (behind an `Arc` if
/// needed) by any number of concurrent callers. Each call owns its request,
/// reply and fault; the only state shared between calls is the call counter.
pub struct Client<T: Transport + 'static = HttpTransport> {
    registry: Arc<OperationRegistry>,
    faults: FaultMapper,
    codec: WireCodec,
    pipeline: ExchangePipeline<T>,
    endpoint: Url,
    request_timeout: Duration,
    next_call_id: AtomicU64,
}

impl Client<HttpTransport> {
    /// Builds a client that talks HTTP to `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn connect(
        config: &ClientConfig,
        registry: OperationRegistry,
        faults: FaultMapper,
    ) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config)?;
        Self::with_transport(config, transport, registry, faults)
    }
}

impl<T: Transport + 'static> Client<T> {
    /// Builds a client over an arbitrary transport.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn with_transport(
        config: &ClientConfig,
        transport: T,
        registry: OperationRegistry,
        faults: FaultMapper,
    ) -> Result<Self, ConfigError> {
        let endpoint = config.validate()?;
        Ok(Self {
            registry: Arc::new(registry),
            faults,
            codec: WireCodec,
            pipeline: build_exchange_pipeline(Arc::new(transport), endpoint.clone()),
            endpoint,
            request_timeout: config.request_timeout,
            next_call_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Invokes the operation registered as `O`.
    ///
    /// # Errors
    ///
    /// See [`Client::invoke`].
    pub async fn call<O: Operation>(&self, request: &O::Request) -> Result<O::Response, InvokeError> {
        self.invoke::<O::Request, O::Response>(O::NAME, request).await
    }

    /// Invokes the operation registered under `name`.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation` if `name` is not registered
    /// - `TypeMismatch` if `Req`/`Resp` are not the operation's types
    /// - `Encode` if the request cannot be serialized
    /// - `Transport` / `Timeout` if the exchange fails
    /// - `MalformedResponse` if the reply cannot be decoded or answers a
    ///   different request
    /// - `Fault` if the service answered with a fault
    pub async fn invoke<Req, Resp>(&self, name: &str, request: &Req) -> Result<Resp, InvokeError>
    where
        Req: Serialize + Sync + 'static,
        Resp: DeserializeOwned + 'static,
    {
        let descriptor = self.resolve::<Req, Resp>(name)?;
        let message_id = new_message_id();
        let body = self
            .codec
            .encode_request(&descriptor, &message_id, request)
            .map_err(InvokeError::Encode)?;

        let exchange = Exchange {
            ctx: ExchangeContext {
                call_id: self.next_call_id.fetch_add(1, Ordering::Relaxed),
                operation: descriptor.name().to_string(),
                action: descriptor.action().to_string(),
                message_id: message_id.clone(),
                call_timeout_ms: duration_ms(self.request_timeout),
            },
            body,
        };

        let reply = self.pipeline.clone().oneshot(exchange).await?;
        self.complete(&descriptor, &message_id, &reply)
    }

    /// Like [`Client::invoke`], but gives up as soon as `cancel` fires.
    ///
    /// Cancelling drops the pending exchange; an HTTP transport releases its
    /// connection and no reply is decoded.
    ///
    /// # Errors
    ///
    /// `InvokeError::Cancelled` on cancellation, otherwise as
    /// [`Client::invoke`].
    pub async fn invoke_cancellable<Req, Resp>(
        &self,
        name: &str,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<Resp, InvokeError>
    where
        Req: Serialize + Sync + 'static,
        Resp: DeserializeOwned + 'static,
    {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(operation = name, "invocation cancelled");
                metrics::counter!(EXCHANGES_TOTAL, "operation" => name.to_string(), "outcome" => "cancelled")
                    .increment(1);
                Err(InvokeError::Cancelled)
            }
            result = self.invoke(name, request) => result,
        }
    }

    fn resolve<Req: 'static, Resp: 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<OperationDescriptor>, InvokeError> {
        let descriptor = self
            .registry
            .resolve(name)
            .map_err(|_| InvokeError::UnknownOperation {
                name: name.to_string(),
            })?;
        check_type(&descriptor, "request", descriptor.request_type(), TypeDescriptor::of::<Req>())?;
        check_type(&descriptor, "response", descriptor.response_type(), TypeDescriptor::of::<Resp>())?;
        Ok(descriptor)
    }

    fn complete<Resp: DeserializeOwned>(
        &self,
        descriptor: &OperationDescriptor,
        message_id: &str,
        reply: &[u8],
    ) -> Result<Resp, InvokeError> {
        let decoded = self
            .codec
            .decode_response::<Resp>(descriptor, reply)
            .map_err(|err| malformed(descriptor, err))?;

        if let Some(relates_to) = decoded.relates_to() {
            if relates_to != message_id {
                return Err(InvokeError::MalformedResponse {
                    operation: descriptor.name().to_string(),
                    reason: format!("reply relates to {relates_to}, expected {message_id}"),
                });
            }
        }

        match decoded {
            Decoded::Reply { body, .. } => Ok(body),
            Decoded::Fault(fault) => Err(InvokeError::Fault(self.faults.map(fault, descriptor))),
        }
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("operations", &self.registry.len())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn new_message_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn check_type(
    descriptor: &OperationDescriptor,
    role: &'static str,
    expected: TypeDescriptor,
    found: TypeDescriptor,
) -> Result<(), InvokeError> {
    if expected == found {
        return Ok(());
    }
    Err(InvokeError::TypeMismatch {
        operation: descriptor.name().to_string(),
        role,
        expected: expected.name,
        found: found.name,
    })
}

fn malformed(descriptor: &OperationDescriptor, err: CodecError) -> InvokeError {
    match err {
        CodecError::MalformedResponse { operation, reason } => {
            InvokeError::MalformedResponse { operation, reason }
        }
        other => InvokeError::MalformedResponse {
            operation: descriptor.name().to_string(),
            reason: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
