//! Metrics middleware for exchanges.
//!
//! Wraps every exchange in a `tracing` span and records a counter and a
//! duration histogram through the `metrics` facade. Without an installed
//! recorder the `metrics` calls are no-ops.

use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::exchange::{Exchange, ExchangeFuture};
use crate::transport::{duration_ms, TransportError};

/// Counter of completed exchanges, labelled by operation and outcome.
pub const EXCHANGES_TOTAL: &str = "wirecall_exchanges_total";
/// Histogram of exchange wall-clock time in seconds.
pub const EXCHANGE_DURATION_SECONDS: &str = "wirecall_exchange_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments exchanges with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Exchange> for MetricsService<S>
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
        let operation = exchange.ctx().operation.clone();
        let call_id = exchange.ctx().call_id;

        let span = info_span!(
            "exchange",
            operation = %operation,
            action = %exchange.ctx().action,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(exchange);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();
                let outcome = outcome_label(&result);
                let elapsed_ms = duration_ms(elapsed);

                tracing::Span::current().record("duration_ms", elapsed_ms);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!(EXCHANGES_TOTAL, "operation" => operation.clone(), "outcome" => outcome)
                    .increment(1);
                metrics::histogram!(EXCHANGE_DURATION_SECONDS, "operation" => operation.clone())
                    .record(elapsed.as_secs_f64());

                tracing::info!(
                    operation = %operation,
                    call_id = call_id,
                    duration_ms = elapsed_ms,
                    outcome = outcome,
                    "exchange complete"
                );

                result
            }
            .instrument(span),
        )
    }
}

/// Label for the `outcome` field and metric label.
#[must_use]
pub fn outcome_label(result: &Result<Bytes, TransportError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(TransportError::Timeout { .. }) => "timeout",
        Err(TransportError::Status { .. }) => "status",
        Err(TransportError::Connect { .. }) => "transport_error",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::service::exchange::tests::make_exchange;

    /// Completes immediately with the configured result.
    struct ImmediateService {
        fail: bool,
    }

    impl Service<Exchange> for ImmediateService {
        type Response = Bytes;
        type Error = TransportError;
        type Future = ExchangeFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, exchange: Exchange) -> Self::Future {
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(TransportError::Status { status: 502 })
                } else {
                    Ok(exchange.body)
                }
            })
        }
    }

    #[tokio::test]
    async fn passes_through_reply() {
        let svc = MetricsLayer.layer(ImmediateService { fail: false });
        let reply = svc.oneshot(make_exchange(42, 5000)).await.unwrap();
        assert_eq!(reply, Bytes::from_static(b"\x80"));
    }

    #[tokio::test]
    async fn passes_through_error() {
        let svc = MetricsLayer.layer(ImmediateService { fail: true });
        let err = svc.oneshot(make_exchange(42, 5000)).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 502 }));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(outcome_label(&Ok(Bytes::new())), "ok");
        assert_eq!(
            outcome_label(&Err(TransportError::Timeout { timeout_ms: 1 })),
            "timeout"
        );
        assert_eq!(
            outcome_label(&Err(TransportError::Status { status: 503 })),
            "status"
        );
        assert_eq!(
            outcome_label(&Err(TransportError::connect("refused"))),
            "transport_error"
        );
    }
}
