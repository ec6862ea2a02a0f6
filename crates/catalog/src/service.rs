use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use dalma_core::asset::{
    normalize_tags, validate_asset_fields, validate_field, validate_polygons, MAX_BREED_LEN,
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN,
};
use dalma_core::types::DbId;
use dalma_db::models::asset::{Asset, AssetSearchParams, CreateAsset, UpdateAsset};
use dalma_db::repositories::AssetRepo;
use dalma_db::DbPool;
use dalma_storage::{BlobStorage, ResourceKind, StoredFile, MODELS_FOLDER, PREVIEWS_FOLDER};

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A file received from a client, ready to be stored.
#[derive(Debug, Clone)]
pub struct UploadedBlob {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Input for creating an asset from a direct file upload.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub name: String,
    pub breed: String,
    pub description: String,
    pub polygons: i32,
    pub tags: Vec<String>,
    pub model: UploadedBlob,
    pub preview: Option<UploadedBlob>,
}

/// Input for persisting a completed generation task as an asset.
///
/// The model artifact still lives at the generator's result URL; the
/// storage provider fetches it from there rather than streaming the bytes
/// through this service.
#[derive(Debug, Clone)]
pub struct GeneratedAsset {
    /// Generation task this asset is derived from. At most one asset may
    /// carry a given task id.
    pub task_id: String,
    pub name: String,
    pub breed: String,
    pub description: String,
    pub polygons: i32,
    pub tags: Vec<String>,
    /// Result artifact URL at the generator.
    pub model_url: String,
    /// Filename to store the artifact under, extension included.
    pub model_filename: String,
    /// Photo the generation started from, if the caller kept it.
    pub source_image_url: Option<String>,
}

/// Outcome of a hard delete.
///
/// Blob deletion is best-effort: a provider failure is recorded here but
/// never prevents the record from being removed.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub asset_id: DbId,
    pub record_deleted: bool,
    /// Storage ids whose blob deletion failed and may need manual cleanup.
    pub blob_failures: Vec<String>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Catalog operations over the asset repository and the blob store.
pub struct AssetCatalog {
    pool: DbPool,
    storage: Arc<dyn BlobStorage>,
}

impl AssetCatalog {
    pub fn new(pool: DbPool, storage: Arc<dyn BlobStorage>) -> Self {
        Self { pool, storage }
    }

    // -- creation --

    /// Create an asset from a directly uploaded model file.
    pub async fn create_from_upload(&self, input: NewUpload) -> Result<Asset, CatalogError> {
        let fields = validate_asset_fields(&input.name, &input.breed, &input.description)?;
        validate_polygons(input.polygons)?;
        let tags = normalize_tags(&input.tags);

        let model = self
            .storage
            .upload(
                input.model.bytes,
                &input.model.filename,
                MODELS_FOLDER,
                ResourceKind::Model,
            )
            .await?;

        let preview = match input.preview {
            Some(blob) => Some(
                self.storage
                    .upload(blob.bytes, &blob.filename, PREVIEWS_FOLDER, ResourceKind::Image)
                    .await?,
            ),
            None => None,
        };

        let create = CreateAsset {
            name: fields.name,
            breed: fields.breed,
            description: fields.description,
            polygons: input.polygons,
            tags,
            model_filename: model.filename,
            model_url: model.url,
            model_storage_id: model.storage_id,
            model_size_bytes: model.size_bytes,
            preview_filename: preview.as_ref().map(|p| p.filename.clone()),
            preview_url: preview.as_ref().map(|p| p.url.clone()),
            preview_storage_id: preview.as_ref().map(|p| p.storage_id.clone()),
            preview_size_bytes: preview.as_ref().map(|p| p.size_bytes),
            meshy_task_id: None,
            generated_from_image: false,
            source_image_url: None,
        };

        let asset = AssetRepo::create(&self.pool, &create).await?;
        info!(asset_id = asset.id, name = %asset.name, "asset created from upload");
        Ok(asset)
    }

    /// Persist a completed generation task as a catalog asset.
    ///
    /// Idempotent per task id: if an asset already carries this task id
    /// (active or not), that asset is returned unchanged. When two saves
    /// race, the partial unique index on the task id picks one winner; the
    /// loser drops its freshly stored blob and returns the winner's record.
    pub async fn create_from_generation(
        &self,
        input: GeneratedAsset,
    ) -> Result<Asset, CatalogError> {
        if let Some(existing) = AssetRepo::find_by_task_id(&self.pool, &input.task_id).await? {
            info!(
                asset_id = existing.id,
                task_id = %input.task_id,
                "generation already saved, returning existing asset"
            );
            return Ok(existing);
        }

        let fields = validate_asset_fields(&input.name, &input.breed, &input.description)?;
        validate_polygons(input.polygons)?;
        let tags = normalize_tags(&input.tags);

        let model = self
            .storage
            .upload_from_url(
                &input.model_url,
                &input.model_filename,
                MODELS_FOLDER,
                ResourceKind::Model,
            )
            .await?;

        let create = CreateAsset {
            name: fields.name,
            breed: fields.breed,
            description: fields.description,
            polygons: input.polygons,
            tags,
            model_filename: model.filename.clone(),
            model_url: model.url.clone(),
            model_storage_id: model.storage_id.clone(),
            model_size_bytes: model.size_bytes,
            preview_filename: None,
            preview_url: None,
            preview_storage_id: None,
            preview_size_bytes: None,
            meshy_task_id: Some(input.task_id.clone()),
            generated_from_image: true,
            source_image_url: input.source_image_url,
        };

        match AssetRepo::insert_generated(&self.pool, &create).await? {
            Some(asset) => {
                info!(
                    asset_id = asset.id,
                    task_id = %input.task_id,
                    "asset created from generation"
                );
                Ok(asset)
            }
            None => {
                // Lost the insert race. Drop our orphaned blob and hand
                // back the winner's record.
                warn!(
                    task_id = %input.task_id,
                    storage_id = %model.storage_id,
                    "concurrent save won the task linkage, discarding duplicate blob"
                );
                self.discard_blob(&model).await;
                AssetRepo::find_by_task_id(&self.pool, &input.task_id)
                    .await?
                    .ok_or(CatalogError::Db(sqlx::Error::RowNotFound))
            }
        }
    }

    // -- reads --

    /// Fetch an active asset.
    pub async fn get(&self, id: DbId) -> Result<Asset, CatalogError> {
        AssetRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    /// List active assets with filtering, sorting, and pagination.
    pub async fn list(&self, params: &AssetSearchParams) -> Result<Vec<Asset>, CatalogError> {
        Ok(AssetRepo::list_active(&self.pool, params).await?)
    }

    /// Distinct breeds across active assets.
    pub async fn breeds(&self) -> Result<Vec<String>, CatalogError> {
        Ok(AssetRepo::distinct_breeds(&self.pool).await?)
    }

    // -- updates --

    /// Partially update an active asset's metadata.
    pub async fn update(&self, id: DbId, mut input: UpdateAsset) -> Result<Asset, CatalogError> {
        if let Some(name) = &input.name {
            input.name = Some(validate_field(name, "name", MAX_NAME_LEN)?);
        }
        if let Some(breed) = &input.breed {
            input.breed = Some(validate_field(breed, "breed", MAX_BREED_LEN)?);
        }
        if let Some(description) = &input.description {
            input.description = Some(validate_field(
                description,
                "description",
                MAX_DESCRIPTION_LEN,
            )?);
        }
        if let Some(polygons) = input.polygons {
            validate_polygons(polygons)?;
        }
        if let Some(tags) = input.tags.take() {
            input.tags = Some(normalize_tags(&tags));
        }

        AssetRepo::update(&self.pool, id, &input)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    /// Record a view and return the asset with its recomputed popularity.
    pub async fn record_view(&self, id: DbId) -> Result<Asset, CatalogError> {
        AssetRepo::increment_views(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    /// Record a download and return the asset with its recomputed popularity.
    pub async fn record_download(&self, id: DbId) -> Result<Asset, CatalogError> {
        AssetRepo::increment_downloads(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    // -- deletion --

    /// Soft-delete: hide the asset from all read paths, keep row and blobs.
    pub async fn deactivate(&self, id: DbId) -> Result<(), CatalogError> {
        if AssetRepo::deactivate(&self.pool, id).await? {
            info!(asset_id = id, "asset deactivated");
            Ok(())
        } else {
            Err(CatalogError::NotFound { id })
        }
    }

    /// Hard-delete an asset and its blobs.
    ///
    /// Blob deletions run first and are best-effort: each failure is
    /// logged and reported, and the row is deleted regardless, so a flaky
    /// provider can never wedge catalog cleanup.
    pub async fn delete(&self, id: DbId) -> Result<DeleteReport, CatalogError> {
        let asset = AssetRepo::find_by_id_any(&self.pool, id)
            .await?
            .ok_or(CatalogError::NotFound { id })?;

        let mut blob_failures = Vec::new();

        let mut targets = vec![(asset.model_storage_id.clone(), ResourceKind::Model)];
        if let Some(preview_id) = asset.preview_storage_id.clone() {
            targets.push((preview_id, ResourceKind::Image));
        }
        for (storage_id, kind) in targets {
            if let Err(err) = self.storage.delete(&storage_id, kind).await {
                warn!(
                    asset_id = id,
                    storage_id = %storage_id,
                    error = %err,
                    "blob deletion failed, continuing with record removal"
                );
                blob_failures.push(storage_id);
            }
        }

        let record_deleted = AssetRepo::delete(&self.pool, id).await?;
        info!(
            asset_id = id,
            record_deleted,
            blob_failures = blob_failures.len(),
            "asset deleted"
        );
        Ok(DeleteReport {
            asset_id: id,
            record_deleted,
            blob_failures,
        })
    }

    // -- helpers --

    /// Best-effort removal of a blob we no longer want.
    async fn discard_blob(&self, blob: &StoredFile) {
        if let Err(err) = self
            .storage
            .delete(&blob.storage_id, ResourceKind::Model)
            .await
        {
            warn!(storage_id = %blob.storage_id, error = %err, "orphaned blob cleanup failed");
        }
    }
}
