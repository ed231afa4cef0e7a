//! Tower middleware layers for the exchange pipeline.
//!
//! - [`timeout`]: Per-exchange timeout enforcement
//! - [`metrics`]: Exchange timing and counting via `tracing` spans and `metrics`
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use metrics::MetricsLayer;
pub use pipeline::{build_exchange_pipeline, ExchangePipeline};
pub use timeout::TimeoutLayer;
