//! Upload Relay
//!
//! Accepts form submissions carrying a large file, validates the text
//! fields, and forwards everything to a downstream API without holding the
//! file in memory.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                    UPLOAD RELAY                      │
//!                       │                                                      │
//!   Browser / CLI       │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!   ────────────────────┼─▶│  http   │───▶│ submission │───▶│    relay     │   │
//!   multipart/form-data │  │ upload  │    │ validator  │    │ orchestrator │   │
//!                       │  └─────────┘    └────────────┘    └──────┬───────┘   │
//!                       │                                          │           │
//!                       │                                          ▼           │
//!                       │                                  ┌──────────────┐    │
//!                       │                                  │    client    │    │
//!                       │                                  │   resolver   │    │
//!                       │                                  └──────┬───────┘    │
//!                       │                                         │            │
//!                       │                                         ▼            │
//!   Response            │  ┌─────────┐                     ┌──────────────┐    │
//!   ◀───────────────────┼──│response │◀────────────────────│  streaming   │────┼──▶ Downstream
//!                       │  │ render  │                     │ relay (spool)│    │     API
//!                       │  └─────────┘                     └──────────────┘    │
//!                       │                                                      │
//!                       │  ┌────────────────────────────────────────────────┐  │
//!                       │  │ config (hot reload) · observability · lifecycle│  │
//!                       │  └────────────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use upload_relay::client::ClientResolver;
use upload_relay::config::ConfigWatcher;
use upload_relay::http::HttpServer;
use upload_relay::lifecycle::{signals, startup, Shutdown};
use upload_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "upload-relay")]
#[command(about = "Validate form uploads and stream them to a downstream API", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = startup::load_configuration(args.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!("upload-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_url = %config.upstream.api_url,
        api_client = %config.upstream.api_client,
        chunk_size = config.upstream.chunk_size,
        max_body_size = config.limits.max_body_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let orchestrator = startup::build_orchestrator(&config, ClientResolver::builtin())?;
    let listener = startup::bind(&config).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Hot reload only when running from a file
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, orchestrator);
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    let signal = signals::wait_for_shutdown_signal().await;
    shutdown.trigger(signal);
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
