use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use shop_ledger_rs::{
    config::{Config, StoreType},
    db,
    metrics::Metrics,
    repos::{InMemoryStore, PgStore, Stores},
    router, AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting shop ledger service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        host = %config.host,
        port = config.port,
        store_type = ?config.store_type,
        recalc_concurrency = config.recalc_concurrency,
        "Configuration loaded"
    );

    let stores = match config.store_type {
        StoreType::InMemory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
        StoreType::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set for the postgres store");

            tracing::info!("Connecting to database...");
            let pool = db::init_pool(database_url)
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running migrations...");
            db::migrate(&pool).await.expect("Failed to run migrations");

            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
    };

    let metrics = Arc::new(Metrics::new().expect("Failed to register metrics"));
    let state = Arc::new(
        AppState::new(
            stores,
            config.recalc_concurrency,
            config.report_default_limit,
            metrics,
        )
        .with_store_type(config.store_type),
    );

    let app = router(state);

    let ip: std::net::IpAddr = config.host.parse().expect("HOST must be a valid IP address");
    let addr = SocketAddr::from((ip, config.port));
    tracing::info!("Shop ledger service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
