//! Blob storage collaborator for model files and preview images.
//!
//! The catalog only ever talks to the [`BlobStorage`] trait; the concrete
//! provider (Cloudinary) is an opaque HTTP service behind it. Storage and
//! database are independent failure domains; callers decide how to react
//! when a blob operation fails.

pub mod cloudinary;

use async_trait::async_trait;

pub use cloudinary::CloudinaryStore;

/// Folder for uploaded/generated model files.
pub const MODELS_FOLDER: &str = "dalma/models";
/// Folder for preview images.
pub const PREVIEWS_FOLDER: &str = "dalma/previews";

/// What kind of resource a blob is, which storage providers use to route
/// uploads and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// 3D model files (stored as raw binary).
    Model,
    /// Preview images.
    Image,
}

impl ResourceKind {
    /// Provider-side resource type name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Model => "raw",
            ResourceKind::Image => "image",
        }
    }
}

/// A blob persisted by the storage provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Original filename, kept for display and downloads.
    pub filename: String,
    /// Publicly fetchable URL.
    pub url: String,
    /// Provider-side identifier used for deletion.
    pub storage_id: String,
    /// Size in bytes as reported by the provider.
    pub size_bytes: i64,
}

/// Errors from the blob storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("storage API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Interface to the blob storage provider.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload raw bytes into `folder`. Returns the stored blob's URL and
    /// provider identifier.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        kind: ResourceKind,
    ) -> Result<StoredFile, StorageError>;

    /// Have the provider fetch a remote URL and store it (used to persist
    /// generator result artifacts without streaming them through us).
    async fn upload_from_url(
        &self,
        url: &str,
        filename: &str,
        folder: &str,
        kind: ResourceKind,
    ) -> Result<StoredFile, StorageError>;

    /// Delete a blob by its provider identifier.
    async fn delete(&self, storage_id: &str, kind: ResourceKind) -> Result<(), StorageError>;
}
