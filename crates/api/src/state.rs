use std::sync::Arc;

use dalma_catalog::AssetCatalog;
use dalma_meshy::{GeneratorApi, Orchestrator};

use crate::config::ServerConfig;

/// Orchestrator over a shared generator client. Holding the trait object
/// here lets tests swap in a scripted generator.
pub type GenerationOrchestrator = Orchestrator<Arc<dyn GeneratorApi>>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dalma_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Catalog service (database + blob storage).
    pub catalog: Arc<AssetCatalog>,
    /// Generation task orchestrator.
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// Cancelled on shutdown so in-flight polling loops stop promptly.
    pub shutdown: tokio_util::sync::CancellationToken,
}
