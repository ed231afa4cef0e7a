//! The unit of work flowing through the middleware pipeline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;
use tower::Service;

use crate::transport::{OutboundCall, Transport, TransportError};

/// Boxed future returned by every service in the exchange pipeline.
pub type ExchangeFuture = Pin<Box<dyn Future<Output = Result<Bytes, TransportError>> + Send>>;

/// Per-call metadata carried alongside the encoded envelope.
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    /// Client-local, monotonically increasing call number.
    pub call_id: u64,
    pub operation: String,
    pub action: String,
    pub message_id: String,
    pub call_timeout_ms: u64,
}

impl ExchangeContext {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// One encoded request on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub ctx: ExchangeContext,
    pub body: Bytes,
}

impl Exchange {
    #[must_use]
    pub fn ctx(&self) -> &ExchangeContext {
        &self.ctx
    }

    fn into_call(self) -> (OutboundCall, Duration) {
        let timeout = self.ctx.call_timeout();
        let call = OutboundCall {
            action: self.ctx.action,
            message_id: self.ctx.message_id,
            content_type: wirecall_core::CONTENT_TYPE,
            body: self.body,
        };
        (call, timeout)
    }
}

// ---------------------------------------------------------------------------
// TransportService
// ---------------------------------------------------------------------------

/// Innermost service: hands the exchange to a `Transport`.
pub struct TransportService<T> {
    transport: Arc<T>,
    endpoint: Arc<Url>,
}

impl<T> TransportService<T> {
    pub fn new(transport: Arc<T>, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint: Arc::new(endpoint),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl<T> Clone for TransportService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            endpoint: Arc::clone(&self.endpoint),
        }
    }
}

impl<T> std::fmt::Debug for TransportService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportService")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl<T> Service<Exchange> for TransportService<T>
where
    T: Transport + 'static,
{
    type Response = Bytes;
    type Error = TransportError;
    type Future = ExchangeFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, exchange: Exchange) -> Self::Future {
        let transport = Arc::clone(&self.transport);
        let endpoint = Arc::clone(&self.endpoint);
        let (call, timeout) = exchange.into_call();
        Box::pin(async move { transport.send(&endpoint, call, timeout).await })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::transport::ScriptedTransport;

    pub(crate) fn make_exchange(call_id: u64, timeout_ms: u64) -> Exchange {
        Exchange {
            ctx: ExchangeContext {
                call_id,
                operation: "DescribeRegions".into(),
                action: "urn:test/DescribeRegions".into(),
                message_id: format!("urn:uuid:{call_id}"),
                call_timeout_ms: timeout_ms,
            },
            body: Bytes::from_static(b"\x80"),
        }
    }

    #[tokio::test]
    async fn forwards_addressing_to_transport() {
        let transport = Arc::new(ScriptedTransport::fixed(Bytes::from_static(b"reply")));
        let svc = TransportService::new(
            Arc::clone(&transport),
            Url::parse("http://stub.invalid/").unwrap(),
        );

        let reply = svc.oneshot(make_exchange(7, 1000)).await.unwrap();
        assert_eq!(reply, Bytes::from_static(b"reply"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, "urn:test/DescribeRegions");
        assert_eq!(calls[0].message_id, "urn:uuid:7");
        assert_eq!(calls[0].content_type, wirecall_core::CONTENT_TYPE);
    }

    #[test]
    fn context_exposes_timeout_as_duration() {
        let exchange = make_exchange(1, 2500);
        assert_eq!(exchange.ctx().call_timeout(), Duration::from_millis(2500));
    }
}
