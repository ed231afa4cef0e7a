//! Exchange pipeline.
//!
//! 1. **Exchange** (`exchange`): the encoded request plus its per-call context
//! 2. **Middleware** (`middleware`): Tower layers (metrics, timeout)
//! 3. **Transport** (`exchange::TransportService`): hands bytes to a `Transport`

pub mod exchange;
pub mod middleware;

pub use exchange::{Exchange, ExchangeContext, ExchangeFuture, TransportService};
pub use middleware::{build_exchange_pipeline, ExchangePipeline};
