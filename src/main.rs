use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_platform::config::Config;
use news_platform::db::Database;
use news_platform::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_platform=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load("news_platform.toml")?.with_env_overrides();
    info!("Loaded configuration, database at {}", config.database.url);

    // Initialize database
    let db = Database::new(&config.database.url, config.database.max_connections).await?;
    db.initialize().await?;
    info!("Database initialized");

    let state = Arc::new(AppState { db: Arc::new(db) });
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
