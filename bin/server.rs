// Check-in Desk - Web Server
//
// Sets up tracing, opens the store, and serves the API router.

use anyhow::Context;
use checkin_desk::api::{build_router, AppState};
use checkin_desk::{open_store, CheckInEngine, Config};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    let store = open_store(&config.db_path)
        .with_context(|| format!("Failed to open store {}", config.db_path.display()))?;
    info!("store opened: {}", config.db_path.display());

    let state = AppState::new(CheckInEngine::new(store));

    let app = build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(
        "check-in desk v{} listening on http://{}",
        checkin_desk::VERSION,
        config.bind_addr
    );
    info!("   API: http://{}/api/stats", config.bind_addr);

    axum::serve(listener, app).await.context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
