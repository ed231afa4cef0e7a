//! Pipeline composition: wraps a transport with every middleware layer.

use std::sync::Arc;

use reqwest::Url;
use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::service::exchange::TransportService;
use crate::transport::Transport;

/// The full exchange stack for transport `T`.
pub type ExchangePipeline<T> = MetricsService<TimeoutService<TransportService<T>>>;

/// Build the exchange pipeline around `transport`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- record timing and outcome, timeouts included
/// 2. `TimeoutLayer` -- enforce the per-exchange deadline
/// 3. `TransportService` -- send the bytes
///
/// The returned service is cheap to clone; each call clones it and drives the
/// clone with `oneshot`.
#[must_use]
pub fn build_exchange_pipeline<T: Transport + 'static>(
    transport: Arc<T>,
    endpoint: Url,
) -> ExchangePipeline<T> {
    ServiceBuilder::new()
        .layer(MetricsLayer)
        .layer(TimeoutLayer)
        .service(TransportService::new(transport, endpoint))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
