//! Route definitions for the `/assets` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET    /                   -> list        (?breed=&search=&sort=&limit=&offset=)
/// POST   /                   -> create      (multipart upload)
/// GET    /stats/breeds       -> breeds
/// GET    /{id}               -> get_one
/// PUT    /{id}               -> update
/// DELETE /{id}               -> delete_one  (hard delete, blobs included)
/// POST   /{id}/view          -> record_view
/// POST   /{id}/download      -> record_download
/// POST   /{id}/deactivate    -> deactivate  (soft delete)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list).post(assets::create))
        .route("/stats/breeds", get(assets::breeds))
        .route(
            "/{id}",
            get(assets::get_one)
                .put(assets::update)
                .delete(assets::delete_one),
        )
        .route("/{id}/view", post(assets::record_view))
        .route("/{id}/download", post(assets::record_download))
        .route("/{id}/deactivate", post(assets::deactivate))
}
