//! Libris Server - library desk
//!
//! REST API server for loans, overdue tracking, SMS notices and barcode scanning.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libris_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::{
        store::{KeyValueStore, MemoryStore, RedisStore},
        Repository,
    },
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    // Open the key/value store
    let store: Arc<dyn KeyValueStore> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, state is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Redis => {
            let store =
                RedisStore::connect(&config.storage.redis_url, &config.storage.key_prefix).await?;
            tracing::info!("Connected to Redis");
            Arc::new(store)
        }
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(store);
    let services = Services::new(repository, &config).await?;

    services.queue.start().await;
    let sweep = services
        .sweep
        .clone()
        .spawn(Duration::from_secs(config.loans.sweep_interval_secs.max(1)));
    let queue = services.queue.clone();

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state)?;

    // Start server
    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweep.abort();
    queue.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> anyhow::Result<Router> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // SMS relay, rate limited per client IP
    let relay = api::sms::relay_router(state.clone())?;

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/students/register", post(api::auth::register_student))
        .route("/auth/students/login", post(api::auth::login_student))
        .route("/auth/librarians/register", post(api::auth::register_librarian))
        .route("/auth/librarians/login", post(api::auth::login_librarian))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/me", get(api::auth::me))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/barcode/:code", get(api::books::get_book_by_code))
        // Loans
        .route("/loans", post(api::loans::create_loan))
        .route("/loans/return", post(api::loans::return_loan))
        // Students
        .route("/students", get(api::students::list_students))
        .route("/students/registered", get(api::students::list_registered))
        .route("/students/:id/loans", get(api::loans::get_student_loans))
        // Overdue tracking
        .route("/overdue", get(api::students::overdue_report))
        .route("/overdue/check", post(api::students::run_overdue_check))
        .route("/overdue/alert", post(api::students::send_overdue_alert))
        // SMS
        .route("/sms/history", get(api::sms::sms_history))
        .route("/sms/dead-letters", get(api::sms::dead_letters))
        // Recommendations
        .route("/recommendations", get(api::recommendations::get_recommendations))
        .route(
            "/recommendations/predict",
            get(api::recommendations::predict_preference),
        )
        // Scanner
        .route("/scanner/scan", post(api::scanner::scan))
        .route("/scanner/manual", post(api::scanner::manual_entry))
        .route("/scanner/history", get(api::scanner::scan_history))
        .with_state(state)
        .merge(relay);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Ok(Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}
