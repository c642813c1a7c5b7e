//! mimicry: HTTP host for the learning dialogue engine.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mimicry::nlp::RuleAnalyzer;
use mimicry::{api, AppState, Engine, EngineConfig, PatternDB, StoreConfig};

#[derive(Parser)]
#[command(name = "mimicry", version, about = "Dialogue engine that learns to talk like its partner")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3920", env = "MIMICRY_PORT")]
    port: u16,

    /// SQLite database path
    #[arg(short, long, default_value = "mimicry.db", env = "MIMICRY_DB")]
    db: String,

    /// Connection pool size
    #[arg(long, default_value = "8", env = "MIMICRY_POOL_SIZE")]
    pool_size: u32,

    /// SQLite busy timeout in milliseconds
    #[arg(long, default_value = "5000", env = "MIMICRY_BUSY_TIMEOUT_MS")]
    busy_timeout_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!(error = %e, "mimicry failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = StoreConfig { pool_size: args.pool_size, busy_timeout: Duration::from_millis(args.busy_timeout_ms) };
    let db = Arc::new(PatternDB::open_with(&args.db, &store)?);
    let config = EngineConfig::from_env();
    let mode = config.mode.clone();
    let engine = Arc::new(Engine::new(db, Arc::new(RuleAnalyzer::new()), config));

    let api_key = std::env::var("MIMICRY_API_KEY").ok().filter(|k| !k.is_empty());
    let auth_status = if api_key.is_some() { "enabled" } else { "disabled" };
    let state = AppState { engine, api_key, started_at: std::time::Instant::now() };
    let app = api::router(state);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        db = %args.db,
        mode = %mode,
        auth = auth_status,
        "mimicry starting"
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "no SIGTERM handler, waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutting down");
}
