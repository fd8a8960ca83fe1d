use dotenvy::dotenv;
use obrador::{
    api::{self, AppState},
    config::{catalog, database, server},
    core,
    errors::Result,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Server settings
    let server_config = server::load_server_config()
        .inspect_err(|e| error!("Invalid server configuration: {}", e))?;

    // 4. Database connection and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the item catalog on first start
    if server_config.catalog_config.exists() {
        let catalog_config = catalog::load_config(&server_config.catalog_config)?;
        let seeded = core::catalog::seed_catalog(&db, &catalog_config)
            .await
            .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
        info!("Catalog seed inserted {} items.", seeded);
    } else {
        warn!(
            "Catalog config {} not found, skipping seed.",
            server_config.catalog_config.display()
        );
    }

    // 6. Serve until Ctrl-C
    let app = api::router(AppState::new(db, server_config.cache_ttl));
    let listener = TcpListener::bind(&server_config.bind_address).await?;
    info!("Listening on {}", server_config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
