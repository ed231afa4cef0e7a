//! Timeout middleware for exchanges.
//!
//! Fails exchanges that exceed their `call_timeout_ms` with
//! `TransportError::Timeout`.

use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};

use crate::service::exchange::{Exchange, ExchangeFuture};
use crate::transport::TransportError;

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with per-exchange timeout enforcement.
///
/// The deadline is read from each exchange's `ctx.call_timeout_ms`, so
/// clients with different timeouts can share the same layer.
#[derive(Debug, Clone)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S> Service<Exchange> for TimeoutService<S>
where
    S: Service<Exchange, Response = Bytes, Error = TransportError> + Send,
    S::Future: Send + 'static,
{
    type Response = Bytes;
    type Error = TransportError;
    type Future = ExchangeFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, exchange: Exchange) -> Self::Future {
        let timeout = exchange.ctx().call_timeout();
        let fut = self.inner.call(exchange);
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(TransportError::timeout(timeout)),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
