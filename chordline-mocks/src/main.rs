//! chordline-mocks - local third-party API stand-ins
//!
//! Runs one combined listener with every provider under `/<slug>` and,
//! unless disabled, one dedicated listener per provider on its own port.
//! All listeners share one `AppState`, so calendar writes made through one
//! are visible through the others.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use chordline_common::config::{load_toml_config, LoggingConfig, MockOverrides, MockServerConfig};
use chordline_common::Provider;
use chordline_mocks::{build_combined_router, build_provider_router, AppState};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for chordline-mocks
#[derive(Parser, Debug)]
#[command(name = "chordline-mocks")]
#[command(about = "Mock third-party APIs for ChordLine local development")]
#[command(version)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "CHORDLINE_MOCK_HOST")]
    host: Option<String>,

    /// Port for the combined server
    #[arg(short, long, env = "CHORDLINE_MOCK_PORT")]
    port: Option<u16>,

    /// Path to a TOML config file
    #[arg(short, long, env = "CHORDLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Only start the combined server
    #[arg(long)]
    no_per_service: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "chordline_mocks={level},chordline_common={level},tower_http=debug",
            level = logging.level
        )
        .into()
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

async fn serve(addr: SocketAddr, app: Router, label: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {} to {}", label, addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{} server error", label))
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // TOML first: it carries the log level
    let toml_config = load_toml_config(args.config.as_deref())?;
    init_tracing(&toml_config.logging)?;

    info!(
        "Starting ChordLine mock services v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = MockOverrides {
        host: args.host,
        combined_port: args.port,
        disable_per_service: args.no_per_service,
    };
    let config = MockServerConfig::resolve(&overrides, &toml_config)
        .context("Invalid mock server configuration")?;
    let state = AppState::new(config.clone());

    let mut servers = JoinSet::new();

    let combined_addr = socket_addr(&config.host, config.combined_port)?;
    info!("Combined mock server on http://{}", combined_addr);
    for provider in Provider::ALL {
        info!(
            "  {:<16} http://{}/{}",
            provider.display_name(),
            combined_addr,
            provider.slug()
        );
    }
    servers.spawn(serve(
        combined_addr,
        build_combined_router(state.clone()),
        "combined".to_string(),
    ));

    if config.per_service {
        for provider in Provider::ALL {
            let addr = socket_addr(&config.host, config.port_for(provider))?;
            info!("{} mock on http://{}", provider.display_name(), addr);
            servers.spawn(serve(
                addr,
                build_provider_router(provider, state.clone()),
                provider.slug().to_string(),
            ));
        }
    } else {
        info!("Per-service listeners disabled");
    }

    // A listener that fails to start takes the whole process down
    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{:#}", e);
                servers.abort_all();
                return Err(e);
            }
            Err(e) => {
                servers.abort_all();
                return Err(e).context("Server task panicked");
            }
        }
    }

    info!("Mock services shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
