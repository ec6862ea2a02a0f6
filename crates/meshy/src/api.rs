//! REST client for the Meshy image-to-3D HTTP endpoints.
//!
//! Wraps task submission, status retrieval, refine submission, and
//! artifact download using [`reqwest`]. The [`GeneratorApi`] trait is the
//! seam the orchestrator is generic over, so tests can script responses
//! without the network.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::MeshyError;
use crate::options::SubmitOptions;
use crate::task::{GenerationTask, ModelFormat, TaskStage, TaskStatus};

/// Network timeout applied to every request, including artifact fetches.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Interface to the external generation service.
///
/// One outbound call per method; no retries at this layer.
#[async_trait]
pub trait GeneratorApi: Send + Sync {
    /// Submit an image (as a base64 data URI) for preview generation.
    /// Returns the generator-assigned task identifier.
    async fn submit_preview(
        &self,
        image_data_uri: &str,
        options: &SubmitOptions,
    ) -> Result<String, MeshyError>;

    /// Submit a refine stage for a succeeded preview task.
    /// Returns a new task identifier.
    async fn submit_refine(&self, preview_task_id: &str) -> Result<String, MeshyError>;

    /// Retrieve the current state of a task.
    async fn get_task(&self, task_id: &str) -> Result<TaskStatusResponse, MeshyError>;

    /// Download an artifact from one of the task's result URLs.
    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, MeshyError>;
}

// Lets callers hold the orchestrator over a shared trait object
// (`Orchestrator<Arc<dyn GeneratorApi>>`).
#[async_trait]
impl<T: GeneratorApi + ?Sized> GeneratorApi for std::sync::Arc<T> {
    async fn submit_preview(
        &self,
        image_data_uri: &str,
        options: &SubmitOptions,
    ) -> Result<String, MeshyError> {
        (**self).submit_preview(image_data_uri, options).await
    }

    async fn submit_refine(&self, preview_task_id: &str) -> Result<String, MeshyError> {
        (**self).submit_refine(preview_task_id).await
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskStatusResponse, MeshyError> {
        (**self).get_task(task_id).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, MeshyError> {
        (**self).fetch_artifact(url).await
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response returned when a task is accepted (`{"result": "<task-id>"}`).
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned task identifier.
    pub result: String,
}

/// Raw task state as returned by `GET /image-to-3d/{task_id}`.
#[derive(Debug, Deserialize)]
pub struct TaskStatusResponse {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    /// Format name -> URL; the generator sends nulls for formats it has
    /// not produced, so values are optional on the wire.
    #[serde(default)]
    pub model_urls: BTreeMap<String, Option<String>>,
}

impl TaskStatusResponse {
    /// Convert the wire state into a [`GenerationTask`] snapshot.
    ///
    /// Result URLs are only carried over for a succeeded task; a poll of a
    /// non-terminal task never yields a stale result URL. Unknown format
    /// keys are dropped.
    pub fn into_task(self, stage: TaskStage) -> GenerationTask {
        let model_urls = if self.status == TaskStatus::Succeeded {
            self.model_urls
                .into_iter()
                .filter_map(|(name, url)| {
                    let format: ModelFormat = name.parse().ok()?;
                    let url = url.filter(|u| !u.is_empty())?;
                    Some((format, url))
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        GenerationTask {
            id: self.id,
            stage,
            status: self.status,
            progress: self.progress,
            model_urls,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// HTTP client for the Meshy API, authenticated with a bearer token.
pub struct MeshyApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MeshyApi {
    /// Create a new API client.
    ///
    /// * `base_url` - e.g. `https://api.meshy.ai`.
    /// * `api_key` - bearer token for the `Authorization` header.
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/openapi/v1/image-to-3d", self.base_url)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`MeshyError::Api`] with the status and
    /// body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, MeshyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MeshyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MeshyError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GeneratorApi for MeshyApi {
    async fn submit_preview(
        &self,
        image_data_uri: &str,
        options: &SubmitOptions,
    ) -> Result<String, MeshyError> {
        let body = serde_json::json!({
            "image_url": image_data_uri,
            "ai_model": "meshy-4",
            "topology": options.topology.as_str(),
            "target_polycount": options.target_polycount,
            "should_remesh": true,
            "should_texture": options.should_texture,
            "enable_pbr": options.enable_pbr,
            "symmetry_mode": options.symmetry_mode.as_str(),
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;
        Ok(submitted.result)
    }

    async fn submit_refine(&self, preview_task_id: &str) -> Result<String, MeshyError> {
        let body = serde_json::json!({
            "mode": "refine",
            "preview_task_id": preview_task_id,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;
        Ok(submitted.result)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskStatusResponse, MeshyError> {
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint(), task_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, MeshyError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
