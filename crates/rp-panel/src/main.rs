//! Relay Panel daemon
//!
//! Serves the JSON API, keeps rule status in line with the managed nodes,
//! and ingests their traffic reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rp_core::config::{self, PanelConfig};
use rp_core::traits::{AuditSink, RemoteConnector, RuleStore};
use rp_panel::audit::TracingAudit;
use rp_panel::client::HttpConnector;
use rp_panel::health::HealthMonitor;
use rp_panel::store::MemoryStore;
use rp_panel::{PanelState, SyncEngine};

#[derive(Parser)]
#[command(name = "rp-panel")]
#[command(about = "Relay Panel control plane daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Public URL nodes push telemetry to (overrides config)
    #[arg(long, env = "RP_PUBLIC_URL")]
    public_url: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    if args.init_config {
        if config_path.exists() {
            anyhow::bail!("Config file {:?} already exists", config_path);
        }
        config::save_config(&config_path, &PanelConfig::default())
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    tracing::info!("Relay Panel starting...");

    let mut config: PanelConfig = if args.config.is_some() {
        config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else if config_path.exists() {
        config::load_config(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", config_path, e);
            PanelConfig::default()
        })
    } else {
        tracing::info!("Using default configuration");
        PanelConfig::default()
    };

    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(url) = args.public_url {
        config.public_url = Some(url);
    }
    config.validate().context("Invalid configuration")?;

    match config.observer_url() {
        Some(url) => tracing::info!("Telemetry will be delivered to {}", url),
        None => tracing::warn!("No public URL configured - rules will run without telemetry"),
    }

    let memory = MemoryStore::with_nodes(&config.nodes);
    tracing::info!("Registered {} nodes", memory.node_count());
    let store: Arc<dyn RuleStore> = Arc::new(memory);

    let connector: Arc<dyn RemoteConnector> = Arc::new(
        HttpConnector::new(config.remote_timeout).context("Failed to build HTTP client")?,
    );
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAudit);

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let health = HealthMonitor::new(
        Arc::clone(&store),
        Arc::clone(&connector),
        config.health_interval,
    )
    .spawn_monitor(cancel.clone());

    let sync = Arc::new(SyncEngine::new(
        Arc::clone(&store),
        Arc::clone(&connector),
        config.sync_interval,
        &cancel,
    ));
    sync.start();

    let bind_addr = config.bind_address.clone();
    let state = Arc::new(PanelState::new(config, store, connector, audit));
    let app = rp_panel::http::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Starting HTTP API on {}", bind_addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    // Server can also exit on its own; make sure background tasks follow
    cancel.cancel();
    sync.shutdown().await;
    if let Err(e) = health.await {
        tracing::warn!("Health monitor task failed: {}", e);
    }

    tracing::info!("Relay Panel shutdown complete");
    Ok(())
}
