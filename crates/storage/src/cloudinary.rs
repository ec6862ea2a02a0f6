//! Cloudinary-backed [`BlobStorage`] implementation.
//!
//! Uses the signed upload/destroy REST endpoints. Models are stored as
//! `raw` resources, previews as `image` resources. Request signing uses
//! SHA-256 over the sorted parameter string plus the API secret.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{BlobStorage, ResourceKind, StorageError, StoredFile};

/// Network timeout for provider calls (uploads can be large).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Blob storage client for a single Cloudinary account.
pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Response body of the upload endpoint (fields we care about).
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    bytes: i64,
}

impl CloudinaryStore {
    /// Create a client for the given Cloudinary account credentials.
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            cloud_name,
            api_key,
            api_secret,
        }
    }

    fn endpoint(&self, kind: ResourceKind, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/{}",
            self.cloud_name,
            kind.as_str(),
            action,
        )
    }

    /// Derive a unique public id from the original filename, mirroring the
    /// `<prefix>-<stem>-<millis>` scheme the previews/models folders use.
    fn public_id(filename: &str, kind: ResourceKind) -> String {
        let stem = filename.rsplit_once('.').map_or(filename, |(s, _)| s);
        let prefix = match kind {
            ResourceKind::Model => "model",
            ResourceKind::Image => "preview",
        };
        format!("{prefix}-{stem}-{}", chrono::Utc::now().timestamp_millis())
    }

    /// Sign request parameters: SHA-256 hex of the `key=value` pairs
    /// (sorted by key, `&`-joined) concatenated with the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = params.to_vec();
        sorted.sort_by_key(|(k, _)| *k);
        let to_sign: Vec<String> = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(to_sign.join("&"));
        hasher.update(&self.api_secret);
        hex_encode(&hasher.finalize())
    }

    /// Build the signed multipart form shared by both upload variants.
    fn signed_upload_form(
        &self,
        folder: &str,
        public_id: &str,
        timestamp: &str,
    ) -> reqwest::multipart::Form {
        let signature = self.sign(&[
            ("folder", folder),
            ("public_id", public_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", timestamp),
        ]);

        reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder.to_string())
            .text("public_id", public_id.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
    }

    async fn send_upload(
        &self,
        form: reqwest::multipart::Form,
        filename: &str,
        kind: ResourceKind,
        fallback_size: i64,
    ) -> Result<StoredFile, StorageError> {
        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::parse_response(response).await?;

        Ok(StoredFile {
            filename: filename.to_string(),
            url: uploaded.secure_url,
            storage_id: uploaded.public_id,
            size_bytes: if uploaded.bytes > 0 {
                uploaded.bytes
            } else {
                fallback_size
            },
        })
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StorageError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BlobStorage for CloudinaryStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        kind: ResourceKind,
    ) -> Result<StoredFile, StorageError> {
        let public_id = Self::public_id(filename, kind);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let size = bytes.len() as i64;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = self
            .signed_upload_form(folder, &public_id, &timestamp)
            .part("file", part);

        let stored = self.send_upload(form, filename, kind, size).await?;
        tracing::info!(
            storage_id = %stored.storage_id,
            folder,
            size_bytes = stored.size_bytes,
            "Uploaded blob",
        );
        Ok(stored)
    }

    async fn upload_from_url(
        &self,
        url: &str,
        filename: &str,
        folder: &str,
        kind: ResourceKind,
    ) -> Result<StoredFile, StorageError> {
        let public_id = Self::public_id(filename, kind);
        let timestamp = chrono::Utc::now().timestamp().to_string();

        // Cloudinary fetches the remote URL itself when `file` is a URL.
        let form = self
            .signed_upload_form(folder, &public_id, &timestamp)
            .text("file", url.to_string());

        let stored = self.send_upload(form, filename, kind, 0).await?;
        tracing::info!(
            storage_id = %stored.storage_id,
            folder,
            source_url = url,
            "Uploaded blob from URL",
        );
        Ok(stored)
    }

    async fn delete(&self, storage_id: &str, kind: ResourceKind) -> Result<(), StorageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", storage_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", &timestamp),
        ]);

        let form = reqwest::multipart::Form::new()
            .text("public_id", storage_id.to_string())
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .multipart(form)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        tracing::info!(storage_id, kind = kind.as_str(), "Deleted blob");
        Ok(())
    }
}

/// Lowercase hex encoding of a digest.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
