//! Standalone stub endpoint emulating a small EC2 surface.
//!
//! ```text
//! mock-endpoint --port 8787 --require-token s3cret --log-format json
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use wirecall_client::config::StubConfig;
use wirecall_client::stub::StubEndpoint;
use wirecall_client::telemetry::{init_tracing, LogFormat};

#[derive(Debug, Parser)]
#[command(version, about = "Envelope-protocol stub endpoint emulating EC2")]
struct Args {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "WIRECALL_STUB_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 picks an ephemeral port).
    #[arg(long, env = "WIRECALL_STUB_PORT", default_value_t = 8787)]
    port: u16,

    /// Require `Authorization: Bearer <token>` on every request.
    #[arg(long, env = "WIRECALL_STUB_TOKEN")]
    require_token: Option<String>,

    /// Artificial delay added before every reply, in milliseconds.
    #[arg(long, env = "WIRECALL_STUB_LATENCY_MS", default_value_t = 0)]
    latency_ms: u64,

    #[arg(long, env = "WIRECALL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let config = StubConfig {
        host: args.host,
        port: args.port,
        required_token: args.require_token,
        latency: Duration::from_millis(args.latency_ms),
    };

    let mut endpoint = StubEndpoint::new(config)?;
    let addr = endpoint.start().await?;
    info!(%addr, "mock endpoint ready");

    endpoint
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await
}
