//! Asset catalog models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use dalma_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub name: String,
    pub breed: String,
    pub description: String,
    pub polygons: i32,
    pub tags: Vec<String>,

    pub model_filename: String,
    pub model_url: String,
    pub model_storage_id: String,
    pub model_size_bytes: i64,

    pub preview_filename: Option<String>,
    pub preview_url: Option<String>,
    pub preview_storage_id: Option<String>,
    pub preview_size_bytes: Option<i64>,

    /// Generation linkage; unique across all assets when present.
    pub meshy_task_id: Option<String>,
    pub generated_from_image: bool,
    pub source_image_url: Option<String>,

    pub downloads: i32,
    pub views: i32,
    /// Derived score, `min(100, (downloads*10 + views) / 10)`.
    pub popularity: i32,

    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Everything needed to insert a new asset row. Field validation happens
/// in the catalog layer before this is constructed.
#[derive(Debug, Clone)]
pub struct CreateAsset {
    pub name: String,
    pub breed: String,
    pub description: String,
    pub polygons: i32,
    pub tags: Vec<String>,

    pub model_filename: String,
    pub model_url: String,
    pub model_storage_id: String,
    pub model_size_bytes: i64,

    pub preview_filename: Option<String>,
    pub preview_url: Option<String>,
    pub preview_storage_id: Option<String>,
    pub preview_size_bytes: Option<i64>,

    pub meshy_task_id: Option<String>,
    pub generated_from_image: bool,
    pub source_image_url: Option<String>,
}

/// DTO for a partial update of an asset's metadata.
///
/// Counters, popularity, linkage, and blob columns are deliberately not
/// updatable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAsset {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub description: Option<String>,
    pub polygons: Option<i32>,
    pub tags: Option<Vec<String>>,
}

/// Sort orders accepted by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSort {
    /// Newest first.
    #[default]
    Newest,
    /// Highest popularity first.
    Popular,
    /// Alphabetical by name.
    Name,
}

impl AssetSort {
    /// ORDER BY clause fragment for this sort. Values are a fixed
    /// whitelist, never interpolated from user input.
    pub fn order_by(self) -> &'static str {
        match self {
            AssetSort::Newest => "created_at DESC",
            AssetSort::Popular => "popularity DESC, created_at DESC",
            AssetSort::Name => "name ASC",
        }
    }
}

/// Query parameters for listing/searching active assets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetSearchParams {
    /// Filter by breed (ILIKE).
    pub breed: Option<String>,
    /// Free-text search across name, breed, and description (ILIKE).
    pub search: Option<String>,
    #[serde(default)]
    pub sort: AssetSort,
    /// Maximum results (default 20, max 100).
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: Option<i64>,
}
