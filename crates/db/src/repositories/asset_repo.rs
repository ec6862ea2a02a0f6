//! Repository for the asset catalog.
//!
//! All read paths filter to active rows; only hard deletion and the
//! generation-linkage lookup see inactive records. Counter bumps recompute
//! the popularity score inside the same statement, so the derived value
//! can never drift from the counters.

use sqlx::PgPool;

use dalma_core::types::DbId;

use crate::models::asset::{Asset, AssetSearchParams, CreateAsset, UpdateAsset};

/// Column list for `assets` queries.
const ASSET_COLUMNS: &str = "\
    id, name, breed, description, polygons, tags, \
    model_filename, model_url, model_storage_id, model_size_bytes, \
    preview_filename, preview_url, preview_storage_id, preview_size_bytes, \
    meshy_task_id, generated_from_image, source_image_url, \
    downloads, views, popularity, is_active, \
    created_at, updated_at";

/// Default page size for asset listing.
const DEFAULT_LIMIT: i64 = 20;

/// Maximum page size for asset listing.
const MAX_LIMIT: i64 = 100;

/// Provides CRUD and linkage operations for the asset catalog.
pub struct AssetRepo;

impl AssetRepo {
    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Insert a new asset row.
    pub async fn create(pool: &PgPool, input: &CreateAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (\
                name, breed, description, polygons, tags, \
                model_filename, model_url, model_storage_id, model_size_bytes, \
                preview_filename, preview_url, preview_storage_id, preview_size_bytes, \
                meshy_task_id, generated_from_image, source_image_url\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {ASSET_COLUMNS}"
        );
        Self::bind_create(sqlx::query_as::<_, Asset>(&query), input)
            .fetch_one(pool)
            .await
    }

    /// Insert a generation-derived asset, yielding to a concurrent winner.
    ///
    /// Uses `ON CONFLICT DO NOTHING` against the partial unique index on
    /// `meshy_task_id`: returns `Some(asset)` when this call created the
    /// row, `None` when another insert for the same task id got there
    /// first (the caller then re-reads the winner's record).
    pub async fn insert_generated(
        pool: &PgPool,
        input: &CreateAsset,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (\
                name, breed, description, polygons, tags, \
                model_filename, model_url, model_storage_id, model_size_bytes, \
                preview_filename, preview_url, preview_storage_id, preview_size_bytes, \
                meshy_task_id, generated_from_image, source_image_url\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (meshy_task_id) WHERE meshy_task_id IS NOT NULL DO NOTHING \
             RETURNING {ASSET_COLUMNS}"
        );
        Self::bind_create(sqlx::query_as::<_, Asset>(&query), input)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Find an active asset by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query =
            format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1 AND is_active = TRUE");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an asset by id regardless of the soft-delete flag.
    ///
    /// Used by hard deletion, which must also be able to clean up
    /// deactivated records.
    pub async fn find_by_id_any(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the asset linked to a generation task, if any.
    ///
    /// Deliberately ignores `is_active`: linkage uniqueness spans
    /// deactivated records, so a repeated save of the same task returns
    /// the existing record instead of inserting a duplicate.
    pub async fn find_by_task_id(
        pool: &PgPool,
        task_id: &str,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE meshy_task_id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// List active assets with optional filters, whitelisted sort, and
    /// clamped pagination. Every query this builds carries
    /// `is_active = TRUE`.
    pub async fn list_active(
        pool: &PgPool,
        params: &AssetSearchParams,
    ) -> Result<Vec<Asset>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        // Build dynamic WHERE clauses with a running bind index.
        let mut conditions = vec!["is_active = TRUE".to_string()];
        let mut bind_idx = 1u32;

        if params.breed.is_some() {
            conditions.push(format!("breed ILIKE ${bind_idx}"));
            bind_idx += 1;
        }
        if params.search.is_some() {
            conditions.push(format!(
                "(name ILIKE ${bind_idx} OR breed ILIKE ${bind_idx} OR description ILIKE ${bind_idx})"
            ));
            bind_idx += 1;
        }

        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE {conditions} \
             ORDER BY {order_by} \
             LIMIT ${limit_idx} OFFSET ${offset_idx}",
            conditions = conditions.join(" AND "),
            order_by = params.sort.order_by(),
            limit_idx = bind_idx,
            offset_idx = bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Asset>(&query);
        if let Some(ref breed) = params.breed {
            q = q.bind(format!("%{breed}%"));
        }
        if let Some(ref search) = params.search {
            q = q.bind(format!("%{search}%"));
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Distinct breeds across active assets, sorted.
    pub async fn distinct_breeds(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT breed FROM assets WHERE is_active = TRUE ORDER BY breed",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(b,)| b).collect())
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Partially update an active asset's metadata.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAsset,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets SET \
                name = COALESCE($2, name), \
                breed = COALESCE($3, breed), \
                description = COALESCE($4, description), \
                polygons = COALESCE($5, polygons), \
                tags = COALESCE($6, tags) \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(input.name.as_deref())
            .bind(input.breed.as_deref())
            .bind(input.description.as_deref())
            .bind(input.polygons)
            .bind(input.tags.as_deref())
            .fetch_optional(pool)
            .await
    }

    /// Atomically bump the view counter and recompute popularity.
    pub async fn increment_views(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets SET \
                views = views + 1, \
                popularity = LEAST(100, (downloads * 10 + views + 1) / 10) \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically bump the download counter and recompute popularity.
    pub async fn increment_downloads(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets SET \
                downloads = downloads + 1, \
                popularity = LEAST(100, ((downloads + 1) * 10 + views) / 10) \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Soft-delete an asset. Returns true if a row was deactivated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE assets SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete an asset row. Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Bind the shared column set of the two insert variants.
    fn bind_create<'q>(
        query: sqlx::query::QueryAs<'q, sqlx::Postgres, Asset, sqlx::postgres::PgArguments>,
        input: &'q CreateAsset,
    ) -> sqlx::query::QueryAs<'q, sqlx::Postgres, Asset, sqlx::postgres::PgArguments> {
        query
            .bind(&input.name)
            .bind(&input.breed)
            .bind(&input.description)
            .bind(input.polygons)
            .bind(&input.tags)
            .bind(&input.model_filename)
            .bind(&input.model_url)
            .bind(&input.model_storage_id)
            .bind(input.model_size_bytes)
            .bind(input.preview_filename.as_deref())
            .bind(input.preview_url.as_deref())
            .bind(input.preview_storage_id.as_deref())
            .bind(input.preview_size_bytes)
            .bind(input.meshy_task_id.as_deref())
            .bind(input.generated_from_image)
            .bind(input.source_image_url.as_deref())
    }
}
