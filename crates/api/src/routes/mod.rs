pub mod assets;
pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /assets                general catalog listing and creation
/// /assets/...            per-asset reads, counters, deletion
/// /generation            photo submission
/// /generation/...        task status, refine, artifact download, save
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::router())
        .nest("/generation", generation::router())
}
