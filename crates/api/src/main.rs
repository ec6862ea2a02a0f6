use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dalma_api::config::{CloudinaryConfig, MeshyConfig, ServerConfig};
use dalma_api::router::build_app_router;
use dalma_api::state::AppState;
use dalma_catalog::AssetCatalog;
use dalma_meshy::{GeneratorApi, MeshyApi, Orchestrator};
use dalma_storage::CloudinaryStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dalma_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let meshy_config = MeshyConfig::from_env();
    let cloudinary_config = CloudinaryConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = dalma_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    dalma_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    dalma_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Blob storage ---
    let storage = Arc::new(CloudinaryStore::new(
        cloudinary_config.cloud_name,
        cloudinary_config.api_key,
        cloudinary_config.api_secret,
    ));

    // --- Catalog service ---
    let catalog = Arc::new(AssetCatalog::new(pool.clone(), storage));

    // --- Generation orchestrator ---
    let generator: Arc<dyn GeneratorApi> = Arc::new(MeshyApi::new(
        meshy_config.base_url.clone(),
        meshy_config.api_key.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::with_poll_config(
        generator,
        meshy_config.poll.clone(),
    ));
    tracing::info!(base_url = %meshy_config.base_url, "Generation client ready");

    // --- Shutdown token ---
    // Cancelled once the server stops accepting connections, so in-flight
    // polling loops end promptly instead of running out their budget.
    let shutdown = tokio_util::sync::CancellationToken::new();

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        catalog,
        orchestrator,
        shutdown: shutdown.clone(),
    };

    // --- Router ---
    let app = build_app_router(state, &config, &meshy_config.poll);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    shutdown.cancel();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
