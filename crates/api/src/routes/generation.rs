//! Route definitions for the `/generation` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generation`.
///
/// ```text
/// POST /                      -> start        (multipart: photo + options)
/// GET  /{task_id}             -> status       (?stage=preview|refine)
/// GET  /{task_id}/wait        -> wait         (blocks until terminal or budget)
/// POST /{task_id}/refine      -> refine
/// GET  /{task_id}/model       -> download     (?format=glb&stage=preview)
/// POST /{task_id}/save        -> save         (persist result as an asset)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::start))
        .route("/{task_id}", get(generation::status))
        .route("/{task_id}/wait", get(generation::wait))
        .route("/{task_id}/refine", post(generation::refine))
        .route("/{task_id}/model", get(generation::download_model))
        .route("/{task_id}/save", post(generation::save))
}
