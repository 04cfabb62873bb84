//! campsync server
//!
//! Serves festival content sync plans and location-gated content to the
//! companion app.
//!
//! ## Features
//!
//! - **Sync planning**: full and incremental download plans under a device budget
//! - **Gated content**: art installations and theme camps revealed by proximity
//! - **Unlock checks**: event-time and geofence unlock decisions

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use campsync::ports::SystemClock;
use campsync::Config;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use campsync_server::{api, bundle::ContentBundle, AppState};

/// campsync server - festival content sync and unlock API
#[derive(Parser, Debug)]
#[command(name = "campsync-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// HTTP API port
    #[arg(long, default_value = "8080", env = "CAMPSYNC_API_PORT")]
    api_port: u16,

    /// Policy configuration file (TOML); defaults apply when omitted
    #[arg(long, env = "CAMPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Content bundle file (TOML); the built-in bundle is used when omitted
    #[arg(long, env = "CAMPSYNC_CONTENT")]
    content: Option<PathBuf>,

    /// Prefix for package download URLs
    #[arg(
        long,
        default_value = "http://localhost:8080",
        env = "CAMPSYNC_DOWNLOAD_BASE_URL"
    )]
    download_base_url: String,

    /// Log level
    #[arg(long, default_value = "info", env = "CAMPSYNC_LOG_LEVEL")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting campsync server");

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    info!(
        system_cap_bytes = config.sync.system_cap_bytes,
        max_accuracy_m = config.unlock.max_accuracy_m,
        "Policy configuration loaded"
    );

    let bundle = match &args.content {
        Some(path) => ContentBundle::load(path)?,
        None => ContentBundle::builtin().context("Failed to load built-in content bundle")?,
    };
    match &bundle.event {
        Some(event) => info!(
            name = event.name.as_deref().unwrap_or("unnamed"),
            start_ms = event.start_ms,
            end_ms = event.end_ms,
            "Event configured"
        ),
        None => info!("No event configured; unlock checks will report no_event"),
    }
    info!(
        packages = bundle.catalog.len(),
        art_installations = bundle.art_installations.len(),
        theme_camps = bundle.theme_camps.len(),
        "Content loaded"
    );

    let state = Arc::new(AppState::new(
        config,
        bundle,
        Arc::new(SystemClock),
        args.download_base_url,
    ));

    let api_addr: SocketAddr = ([0, 0, 0, 0], args.api_port).into();
    let app = api::router(state);

    info!(addr = %api_addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .context("Failed to bind API server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("campsync server shutting down");
    Ok(())
}

/// Wait for a ctrl-c signal for graceful shutdown
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, initiating graceful shutdown");
}
