use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use leadpulse_duckdb::DuckDbBackend;
use leadpulse_filestore::FileSessionStore;
use leadpulse_server::{config::Config, seed, state::AppState};

/// `leadpulse health` — liveness probe for container health checks.
///
/// Calls `GET http://localhost:$LEADPULSE_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("LEADPULSE_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("leadpulse=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = cfg.db_path();
    let db = DuckDbBackend::open(&db_path.to_string_lossy(), &cfg.duckdb_memory_limit)?;
    let sessions = FileSessionStore::init(cfg.analytics_dir()).await?;

    if !cfg.seed_files.is_empty() {
        seed::seed_from_files(&db, &cfg.seed_files).await;
    }

    let state = Arc::new(AppState::new(
        Arc::new(db),
        Arc::new(sessions),
        cfg.clone(),
    ));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = leadpulse_server::app::build_app(state);

    info!(port = cfg.port, data_dir = %cfg.data_dir, "LeadPulse listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("LeadPulse stopped");
    Ok(())
}
