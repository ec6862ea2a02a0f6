//! Handlers for the `/generation` resource.
//!
//! Drives the photo-to-3D flow: submit a photo, watch the task, optionally
//! refine, download the artifact, and save the result into the catalog.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use dalma_catalog::GeneratedAsset;
use dalma_meshy::options::DEFAULT_TARGET_POLYCOUNT;
use dalma_meshy::{
    GenerationTask, MeshyError, ModelFormat, SubmitOptions, SymmetryMode, TaskStage, TaskStatus,
    Topology,
};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A newly submitted generation task.
#[derive(Debug, Serialize)]
pub struct GenerationStarted {
    pub task_id: String,
    pub stage: TaskStage,
}

/// Stage selector shared by the status endpoints. Defaults to `preview`.
#[derive(Debug, Deserialize)]
pub struct StageQuery {
    pub stage: Option<TaskStage>,
}

/// POST /api/v1/generation
///
/// Submit a photo for preview generation. Multipart parts:
///
/// - `photo` (file, required)
/// - `topology` (`triangle` | `quad`), `symmetry`, `polycount`,
///   `texture`, `pbr` (text, optional)
///
/// Returns 202 with the generator-assigned task id; progress is observed
/// via `GET /{task_id}` or `GET /{task_id}/wait`.
pub async fn start(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<GenerationStarted>>)> {
    let (photo, content_type, options) = parse_submission(multipart).await?;

    let task_id = state
        .orchestrator
        .submit_preview_task(&photo, &content_type, options)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: GenerationStarted {
                task_id,
                stage: TaskStage::Preview,
            },
        }),
    ))
}

/// GET /api/v1/generation/{task_id}
///
/// One status probe, no waiting.
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<StageQuery>,
) -> AppResult<Json<DataResponse<GenerationTask>>> {
    let stage = query.stage.unwrap_or(TaskStage::Preview);
    let task = state.orchestrator.task_status(&task_id, stage).await?;
    Ok(Json(DataResponse { data: task }))
}

/// GET /api/v1/generation/{task_id}/wait
///
/// Block until the task reaches a terminal state or the polling budget
/// runs out (504). Polling stops early if the server begins shutting down.
pub async fn wait(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<StageQuery>,
) -> AppResult<Json<DataResponse<GenerationTask>>> {
    let stage = query.stage.unwrap_or(TaskStage::Preview);
    let task = state
        .orchestrator
        .poll_until_terminal(&task_id, stage, &state.shutdown, |progress| {
            tracing::debug!(task_id = %task_id, progress, "Generation progress");
        })
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// POST /api/v1/generation/{task_id}/refine
///
/// Start the refine stage for a succeeded preview task. 409 until the
/// preview has succeeded.
pub async fn refine(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<(StatusCode, Json<DataResponse<GenerationStarted>>)> {
    let refine_task_id = state.orchestrator.submit_refine_task(&task_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: GenerationStarted {
                task_id: refine_task_id,
                stage: TaskStage::Refine,
            },
        }),
    ))
}

/// Query parameters for the artifact download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Artifact format (default `glb`).
    pub format: Option<String>,
    pub stage: Option<TaskStage>,
}

/// GET /api/v1/generation/{task_id}/model
///
/// Proxy a result artifact in the requested format. 409 while the task is
/// not yet succeeded, 400 for a format the task did not produce.
pub async fn download_model(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<impl IntoResponse> {
    let stage = query.stage.unwrap_or(TaskStage::Preview);
    let format = parse_format(query.format.as_deref())?;

    let (bytes, content_type) = state
        .orchestrator
        .fetch_result(&task_id, stage, format)
        .await?;

    let disposition = format!("attachment; filename=\"{task_id}.{format}\"");
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// JSON body for saving a generation result into the catalog.
#[derive(Debug, Deserialize)]
pub struct SaveGenerationRequest {
    pub name: String,
    pub breed: String,
    pub description: String,
    /// Polygon count to record; defaults to the submission default.
    pub polygons: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Artifact format to persist (default `glb`).
    pub format: Option<String>,
    pub stage: Option<TaskStage>,
    /// Photo URL the generation started from, if the client kept it.
    pub source_image_url: Option<String>,
}

/// POST /api/v1/generation/{task_id}/save
///
/// Persist a succeeded task's artifact as a catalog asset. Idempotent per
/// task id: repeating the call returns the already-saved asset.
pub async fn save(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(body): Json<SaveGenerationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<dalma_db::models::asset::Asset>>)> {
    let stage = body.stage.unwrap_or(TaskStage::Preview);
    let format = parse_format(body.format.as_deref())?;

    let task = state.orchestrator.task_status(&task_id, stage).await?;
    if task.status != TaskStatus::Succeeded {
        return Err(MeshyError::ResultNotReady {
            task_id,
            status: task.status,
        }
        .into());
    }
    let model_url = task
        .model_urls
        .get(&format)
        .cloned()
        .ok_or_else(|| MeshyError::UnsupportedFormat {
            task_id: task_id.clone(),
            requested: format.to_string(),
            available: task.available_formats(),
        })?;

    let model_filename = format!(
        "{}.{format}",
        body.name.trim().to_lowercase().replace(' ', "-")
    );

    let asset = state
        .catalog
        .create_from_generation(GeneratedAsset {
            task_id,
            name: body.name,
            breed: body.breed,
            description: body.description,
            polygons: body.polygons.unwrap_or(DEFAULT_TARGET_POLYCOUNT as i32),
            tags: body.tags,
            model_url,
            model_filename,
            source_image_url: body.source_image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

// ── Private helpers ──────────────────────────────────────────────────────

fn parse_format(raw: Option<&str>) -> AppResult<ModelFormat> {
    match raw {
        None => Ok(ModelFormat::Glb),
        Some(raw) => raw.parse().map_err(|_| {
            let known: Vec<_> = ModelFormat::ALL.iter().map(|f| f.as_str()).collect();
            AppError::BadRequest(format!(
                "Unknown model format '{raw}', expected one of: {}",
                known.join(", ")
            ))
        }),
    }
}

/// Collect the photo bytes and submission options from the multipart body.
async fn parse_submission(
    mut multipart: Multipart,
) -> AppResult<(Vec<u8>, String, SubmitOptions)> {
    let mut photo = None;
    let mut content_type = None;
    let mut options = SubmitOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "photo" => {
                content_type = field.content_type().map(str::to_string);
                photo = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read photo: {e}")))?
                        .to_vec(),
                );
            }
            "topology" => {
                let raw = read_text(field, "topology").await?;
                options.topology = match raw.trim().to_lowercase().as_str() {
                    "triangle" => Topology::Triangle,
                    "quad" => Topology::Quad,
                    other => {
                        return Err(AppError::BadRequest(format!(
                            "Unknown topology '{other}', expected 'triangle' or 'quad'"
                        )))
                    }
                };
            }
            // Unknown symmetry values fall back to auto rather than
            // failing the whole submission.
            "symmetry" => {
                let raw = read_text(field, "symmetry").await?;
                options.symmetry_mode = SymmetryMode::from_param(raw.trim());
            }
            "polycount" => {
                let raw = read_text(field, "polycount").await?;
                options.target_polycount = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest("polycount must be an integer".into()))?;
            }
            "texture" => {
                options.should_texture = read_bool(field, "texture").await?;
            }
            "pbr" => {
                options.enable_pbr = read_bool(field, "pbr").await?;
            }
            _ => {}
        }
    }

    let photo = photo.ok_or_else(|| AppError::BadRequest("photo file is required".into()))?;
    if photo.is_empty() {
        return Err(AppError::BadRequest("photo file is empty".into()));
    }
    let content_type = content_type.unwrap_or_else(|| "image/jpeg".to_string());

    Ok((photo, content_type, options))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {name}: {e}")))
}

async fn read_bool(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<bool> {
    let raw = read_text(field, name).await?;
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::BadRequest(format!("{name} must be a boolean"))),
    }
}
