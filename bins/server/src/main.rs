//! Payvault API Server
//!
//! Main entry point for the Payvault ledger service.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payvault_api::{AppState, create_router};
use payvault_db::{Services, connect_with};
use payvault_shared::{AppConfig, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payvault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Wire services to the configured backend
    let services = match config.database.backend {
        StorageBackend::Postgres => {
            let db = connect_with(&config.database).await?;
            info!(
                max_connections = config.database.max_connections,
                lock_timeout_ms = config.database.lock_timeout_ms,
                "Connected to database"
            );
            Services::postgres(db, &config.database, &config.ledger)
        }
        StorageBackend::Memory => {
            info!("Using in-process storage; balances are lost on exit");
            Services::memory(&config.database, &config.ledger)
        }
    };

    // Create router
    let app = create_router(AppState::from(services));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
