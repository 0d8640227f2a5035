//! bridge-server - HTTP entrypoint for the bridge orchestrator
//!
//! Configuration is loaded from (in order, later wins):
//! 1. Compiled defaults
//! 2. `.env` file (if present)
//! 3. Environment variables

use anyhow::{Context, Result};
use bridge_core::BridgeConfig;
use bridge_server::{build_router, build_runtime};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bridge-server")]
#[command(about = "LLM <-> MCP tool-host bridge orchestrator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override PORT from the environment
        #[arg(long)]
        port: Option<u16>,

        /// Show the resolved configuration and exit
        #[arg(long)]
        show_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, show_config } => {
            let mut config = BridgeConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }

            if show_config {
                println!("{config:#?}");
                return Ok(());
            }

            tracing::info!(port = config.port, endpoint = %config.local_mcp_endpoint, "bridge-server starting");

            let runtime = build_runtime(&config);
            let app = build_router(runtime, config.front_origin.as_deref());

            let addr = format!("0.0.0.0:{}", config.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind to {addr}"))?;

            tracing::info!("bridge-server ready on http://{addr}");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
