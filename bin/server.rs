// Squad Ledger - Web Server
// REST API with Axum over the SQLite roster

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use squad_ledger::api::{router, AppState};
use squad_ledger::logging::init_tracing;
use squad_ledger::{Config, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "squad-server")]
#[command(about = "REST API for chat transcript ingestion", long_about = None)]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SQUAD_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(short, long, env = "SQUAD_DB")]
    database: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:3000 (overrides the config file)
    #[arg(short, long, env = "SQUAD_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("squad_ledger=info,squad_server=info,tower_http=info");

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    info!("🌐 Squad Ledger - Web Server v{}", squad_ledger::VERSION);

    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;
    info!(path = %config.database_path.display(), "database opened");

    let state = AppState::new(store, config.ingest_options());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("🚀 Server running on http://{}", config.bind_addr);
    info!("   API: http://{}/api/players", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C (or SIGTERM on unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
