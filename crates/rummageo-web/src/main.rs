//! RummaGEO web server
//!
//! Run with: cargo run -p rummageo-web

use tracing::info;
use tracing_subscriber::EnvFilter;

use rummageo_web::config::Config;
use rummageo_web::router::build_router;
use rummageo_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rummageo=debug,tower_http=info,info")),
        )
        .init();

    info!("Starting RummaGEO web server...");

    let config = Config::load()?;
    let addr = config.bind_addr();
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
