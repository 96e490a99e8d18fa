//! chordline-health - probe every provider's `/health` endpoint
//!
//! Prints one row per provider and exits non-zero when any is unhealthy.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chordline_client::{health_check, ServiceConfig};
use chordline_common::config::{load_toml_config, AppMode, LoggingConfig, ServiceEndpoints};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chordline-health")]
#[command(about = "Check the health of ChordLine's third-party services")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "CHORDLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the app mode (local or production)
    #[arg(short, long)]
    mode: Option<String>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "chordline_client={level},chordline_common={level}",
            level = logging.level
        )
        .into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<bool> {
    let toml_config = load_toml_config(args.config.as_deref())?;
    init_tracing(&toml_config.logging);

    let mode = match args.mode.as_deref() {
        Some(raw) => AppMode::parse_lenient(raw),
        None => AppMode::resolve(&toml_config),
    };
    info!("Checking services in {} mode", mode);

    let config = ServiceConfig::new(ServiceEndpoints::resolve(mode, &toml_config))?;
    let urls = config.urls();
    let results = health_check(&config).await;

    println!("{:<16} {:<10} {:>8}  {}", "SERVICE", "STATUS", "LATENCY", "URL");
    for (provider, health) in &results {
        let url = urls.get(provider).map(String::as_str).unwrap_or("-");
        println!(
            "{:<16} {:<10} {:>6}ms  {}{}",
            provider.display_name(),
            health.status,
            health.latency_ms,
            url,
            health.error.as_deref().map(|e| format!("  ({})", e)).unwrap_or_default()
        );
    }

    let unhealthy = results.values().filter(|h| !h.is_healthy()).count();
    if unhealthy > 0 {
        warn!("{} of {} services unhealthy", unhealthy, results.len());
    }
    Ok(unhealthy == 0)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("chordline-health: {:#}", e);
            ExitCode::from(2)
        }
    }
}
