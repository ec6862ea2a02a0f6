use dalma_core::error::CoreError;
use dalma_core::types::DbId;
use dalma_storage::StorageError;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The asset does not exist or is deactivated.
    #[error("asset {id} not found")]
    NotFound { id: DbId },

    /// Field validation failed before anything was persisted.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The blob storage provider failed during a required operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Database error.
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
