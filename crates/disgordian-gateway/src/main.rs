//! Disgordian gateway client.
//!
//! - Config: `disgordian.yaml` (or the path given as first argument)
//! - One session per run, no reconnect
//! - Ctrl-C ends the session cleanly
//! - Every Dispatch is logged by the built-in log handler

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use disgordian_gateway::{client::GatewayClient, config, services::LogEventHandler};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "disgordian.yaml".into());
    let client = match config::load_from_file(&path).and_then(GatewayClient::new) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(%path, error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };
    client.router().subscribe_all(Arc::new(LogEventHandler::new()));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                shutdown.cancel();
            }
        });
    }

    // Command/REST collaborators would hold clones of this sender.
    let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();

    let result = client.run(shutdown, outbound_rx).await;
    tracing::debug!(metrics = %client.metrics().render(), "final metrics");

    match result {
        Ok(summary) => {
            tracing::info!(
                end = ?summary.end,
                dispatches = summary.dispatches,
                last_sequence = ?summary.last_sequence,
                "disgordian exiting"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "disgordian exiting");
            ExitCode::FAILURE
        }
    }
}
