//! Slot service entry point
//!
//! Usage:
//!   slot-service serve -c games/aurora.json -c games/nebula.yaml
//!   slot-service serve -c games/aurora.json --rng-addr 127.0.0.1:50051
//!   slot-service rng --listen 127.0.0.1:50051

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use slot_engine::{ChaChaSource, ConfigStore, GameService, SpinCoordinator};
use slot_service::{EngineSource, RemoteRandomSource, RngServer, SpinServer, load_configs};

#[derive(Parser)]
#[command(name = "slot-service", about = "Slot spin resolution service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve spins for the given game configs
    Serve {
        /// Game config file (.json, .yaml, .yml); repeatable
        #[arg(short = 'c', long = "config", required = true)]
        configs: Vec<PathBuf>,
        /// Address to accept spin clients on
        #[arg(short, long, default_value = "127.0.0.1:50052")]
        listen: String,
        /// Remote RNG server; draws locally when omitted
        #[arg(long)]
        rng_addr: Option<String>,
        /// Deadline for each RNG request
        #[arg(long, default_value_t = 2000)]
        rng_timeout_ms: u64,
    },
    /// Run the standalone RNG server
    Rng {
        /// Address to accept RNG requests on
        #[arg(short, long, default_value = "127.0.0.1:50051")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            configs,
            listen,
            rng_addr,
            rng_timeout_ms,
        } => serve(configs, &listen, rng_addr, rng_timeout_ms).await,
        Commands::Rng { listen } => run_rng(&listen).await,
    }
}

async fn serve(
    config_paths: Vec<PathBuf>,
    listen: &str,
    rng_addr: Option<String>,
    rng_timeout_ms: u64,
) -> Result<()> {
    let configs = load_configs(&config_paths).context("Failed to load game configs")?;
    let store = Arc::new(configs.into_iter().collect::<ConfigStore>());

    let source = match rng_addr {
        Some(addr) => EngineSource::Remote(RemoteRandomSource::new(addr)),
        None => EngineSource::Local(ChaChaSource::from_os()),
    };
    log::info!(
        "Starting slot-service: {} games, {} randomness, {}ms RNG timeout",
        store.len(),
        source.describe(),
        rng_timeout_ms
    );

    let coordinator =
        SpinCoordinator::new(source).with_timeout(Duration::from_millis(rng_timeout_ms));
    let server = SpinServer::new(GameService::new(store, coordinator), config_paths);

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    server.run_until(listener, shutdown_signal()).await?;
    Ok(())
}

async fn run_rng(listen: &str) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    RngServer::new(ChaChaSource::from_os())
        .run_until(listener, shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
