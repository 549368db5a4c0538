use sdc_backend::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    storage::{LocalStorage, StorageService, StorageState},
    store::{InMemoryDocumentStore, PostgresDocumentStore, StoreState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point: Configuration, Logging, Document Store, Upload
/// Storage, and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup (RUST_LOG wins when set)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sdc_backend=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Document Store Initialization
    let store: StoreState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let store = PostgresDocumentStore::new(pool);
            store
                .ensure_schema()
                .await
                .expect("FATAL: Failed to prepare the documents table.");
            tracing::info!("Connected to Postgres document store");
            Arc::new(store)
        }
        None => {
            // Only reachable locally; AppConfig::load refuses this in production.
            tracing::warn!("DATABASE_URL not set, using the in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    // 5. Upload Storage Initialization
    let local_storage = LocalStorage::new(config.upload_path.clone());
    local_storage
        .prepare()
        .await
        .expect("FATAL: Failed to create upload directories. Check UPLOAD_PATH.");
    tracing::info!(root = %local_storage.root().display(), "Serving uploads from disk");
    let storage = Arc::new(local_storage) as StorageState;

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        store,
        storage,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {}: {}", addr, e));

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
