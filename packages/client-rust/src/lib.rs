//! `wirecall` Client: transport invoker, exchange middleware, and the typed
//! client facade, plus a stub endpoint for tests and local development.

pub mod client;
pub mod config;
pub mod error;
pub mod service;
pub mod stub;
pub mod telemetry;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ConfigError, Credentials, StubConfig, TlsConfig};
pub use error::InvokeError;
pub use transport::{
    EchoTransport, HttpTransport, OutboundCall, ScriptedTransport, StalledTransport, Transport,
    TransportError,
};

pub use tokio_util::sync::CancellationToken;
