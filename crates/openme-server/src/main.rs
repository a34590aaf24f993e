//! openme knock server
//!
//! Listens for single packet authentication knocks and opens short-lived
//! firewall pinholes for clients that prove their identity with a single
//! UDP datagram.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod knock_server;
mod pipeline;

use openme_config::{LogFormat, ServerInit};
use openme_core::ReplayCache;
use openme_firewall::FirewallManager;
use pipeline::PipelineState;

#[derive(Parser)]
#[command(name = "openme-server")]
#[command(about = "Single packet authentication knock server")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "/etc/openme/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let init = ServerInit::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

    setup_logging(&init.log_level, init.log_format);
    info!("starting openme server");

    run(init).await
}

fn setup_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        LogFormat::Pretty => subscriber.with(fmt::layer().pretty()).init(),
    }
}

async fn run(init: ServerInit) -> Result<()> {
    let udp_port = init.udp_port;
    let health_port = init.health_port;

    let replay_cache = Arc::new(ReplayCache::new(init.replay_window));
    let pruner = replay_cache.clone().spawn_pruner();

    let backend = init.firewall_backend.build();
    let manager = Arc::new(FirewallManager::new(backend, init.knock_timeout));

    let state = Arc::new(PipelineState {
        server_secret: init.server_secret,
        replay_cache,
        registry: Arc::new(init.registry),
        manager,
        allow_delegated_target: init.allow_delegated_target,
    });

    let shutdown = async {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
    };

    let result = knock_server::run(udp_port, state, health_port, shutdown).await;

    pruner.abort();
    result
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}
