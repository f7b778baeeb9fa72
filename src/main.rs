//! Stepwise blog server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──▶ http server (request id, tracing, limits, headers)
//!     ──▶ middleware (current user, installation gate)
//!     ──▶ dispatch ──▶ route table ──▶ step pipeline ──▶ steps
//!                                                          │
//!                           store, sessions, passwords ◀───┘
//!     ◀── response written by the step that short-circuited
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use stepwise_blog::config::load_or_default;
use stepwise_blog::lifecycle::{self, signals, Shutdown};
use stepwise_blog::observability::{logging, metrics};
use stepwise_blog::HttpServer;

const DEFAULT_CONFIG: &str = "blog.toml";
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(name = "stepwise-blog", version, about = "Feature-tree blog server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A missing default file means built-in defaults; an explicit path must exist.
    let required = args.config.as_os_str() != DEFAULT_CONFIG;
    let mut config = load_or_default(&args.config, required)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "stepwise-blog starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        features = %config.features.root.display(),
        persistent = config.storage.data_file.is_some(),
        tls = config.listener.tls.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let tls = config.listener.tls.clone();
    let app = lifecycle::build_application(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    lifecycle::spawn_session_purger(app.services.clone(), &shutdown, SESSION_PURGE_INTERVAL);

    let server = HttpServer::new(app);
    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address
                .parse()
                .with_context(|| format!("invalid bind address {bind_address}"))?;
            server.run_tls(addr, &tls, &shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, &shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
