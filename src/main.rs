use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use turnstile::clock::{Clock, SystemClock};
use turnstile::config::TurnstileConfig;
use turnstile::gate::{GateServer, GateState};
use turnstile::ratelimit::RateLimiterRegistry;
use turnstile::session::{SessionStore, StaticUserDirectory};
use turnstile::sweep::Sweeper;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Request gate with fixed-window rate limiting and in-memory sessions.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init(),
    }

    info!("Starting Turnstile request gate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = TurnstileConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let limiters = Arc::new(RateLimiterRegistry::from_config(
        &config.rate_limiting,
        clock.clone(),
    ));
    let sessions = Arc::new(SessionStore::with_clock(config.session.ttl(), clock.clone()));
    let users = Arc::new(StaticUserDirectory::new(config.users.clone()));
    info!(accounts = users.len(), ttl_secs = config.session.ttl_secs, "Session store initialized");

    let sweeper = Sweeper::new();
    sweeper.spawn(
        "rate_limits",
        limiters.clone(),
        config.rate_limiting.sweep_interval(),
    );
    sweeper.spawn("sessions", sessions.clone(), config.session.sweep_interval());

    let state = GateState::new(limiters, sessions, users)
        .with_reporter(config.reporting.backend.build())
        .with_clock(clock)
        .with_secure_cookie(config.session.secure_cookie);

    let server = GateServer::new(config.server.listen_addr, state);

    // Run the server with graceful shutdown on Ctrl+C
    let served = server.serve_with_shutdown(shutdown_signal()).await;

    sweeper.shutdown().await;

    served?;
    info!("Turnstile request gate stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
