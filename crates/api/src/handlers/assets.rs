//! Handlers for the `/assets` resource.
//!
//! Catalog CRUD plus the two engagement counters. Reads only ever see
//! active assets; hard deletion reports blob cleanup failures instead of
//! hiding them.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use dalma_catalog::{DeleteReport, NewUpload, UploadedBlob};
use dalma_core::types::DbId;
use dalma_db::models::asset::{Asset, AssetSearchParams, UpdateAsset};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/assets
///
/// List active assets with optional breed filter, free-text search,
/// sorting, and pagination.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AssetSearchParams>,
) -> AppResult<Json<DataResponse<Vec<Asset>>>> {
    let assets = state.catalog.list(&params).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// POST /api/v1/assets
///
/// Create an asset from a multipart upload. Expected parts:
///
/// - `model` (file, required), `preview` (file, optional)
/// - `name`, `breed`, `description` (text, required)
/// - `polygons` (text, required), `tags` (text, comma-separated, optional)
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Asset>>)> {
    let input = parse_upload(multipart).await?;
    let asset = state.catalog.create_from_upload(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/assets/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = state.catalog.get(id).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// PUT /api/v1/assets/{id}
///
/// Partial metadata update; absent fields keep their current values.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAsset>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = state.catalog.update(id, input).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// DELETE /api/v1/assets/{id}
///
/// Hard-delete the asset and its blobs. The report lists any blobs the
/// provider failed to remove; the record is gone either way.
pub async fn delete_one(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DeleteReport>>> {
    let report = state.catalog.delete(id).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/assets/{id}/view
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = state.catalog.record_view(id).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets/{id}/download
pub async fn record_download(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = state.catalog.record_download(id).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets/{id}/deactivate
///
/// Soft-delete: the asset disappears from reads but keeps its row and
/// blobs.
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.catalog.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/assets/stats/breeds
pub async fn breeds(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let breeds = state.catalog.breeds().await?;
    Ok(Json(DataResponse { data: breeds }))
}

// ── Private helpers ──────────────────────────────────────────────────────

/// Collect the multipart fields of an asset upload.
async fn parse_upload(mut multipart: Multipart) -> AppResult<NewUpload> {
    let mut name = None;
    let mut breed = None;
    let mut description = None;
    let mut polygons = None;
    let mut tags = Vec::new();
    let mut model = None;
    let mut preview = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "model" | "preview" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest(format!("{field_name} must be a file")))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {field_name}: {e}")))?
                    .to_vec();
                let blob = UploadedBlob { bytes, filename };
                if field_name == "model" {
                    model = Some(blob);
                } else {
                    preview = Some(blob);
                }
            }
            "name" => name = Some(read_text(field, "name").await?),
            "breed" => breed = Some(read_text(field, "breed").await?),
            "description" => description = Some(read_text(field, "description").await?),
            "polygons" => {
                let raw = read_text(field, "polygons").await?;
                let value: i32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest("polygons must be an integer".into()))?;
                polygons = Some(value);
            }
            "tags" => {
                let raw = read_text(field, "tags").await?;
                tags = raw.split(',').map(str::to_string).collect();
            }
            // Unknown parts are ignored rather than rejected.
            _ => {}
        }
    }

    Ok(NewUpload {
        name: name.ok_or_else(|| AppError::BadRequest("name is required".into()))?,
        breed: breed.ok_or_else(|| AppError::BadRequest("breed is required".into()))?,
        description: description
            .ok_or_else(|| AppError::BadRequest("description is required".into()))?,
        polygons: polygons.ok_or_else(|| AppError::BadRequest("polygons is required".into()))?,
        tags,
        model: model.ok_or_else(|| AppError::BadRequest("model file is required".into()))?,
        preview,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {name}: {e}")))
}
