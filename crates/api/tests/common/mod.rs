//! Shared helpers for API integration tests: a scripted generator, an
//! in-memory blob store, and a full application router over both.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;

use dalma_api::config::ServerConfig;
use dalma_api::router::build_app_router;
use dalma_api::state::AppState;
use dalma_catalog::AssetCatalog;
use dalma_meshy::api::TaskStatusResponse;
use dalma_meshy::{
    GeneratorApi, MeshyError, Orchestrator, PollConfig, SubmitOptions, TaskStatus,
};
use dalma_storage::{BlobStorage, ResourceKind, StorageError, StoredFile};

// ---------------------------------------------------------------------------
// Scripted generator
// ---------------------------------------------------------------------------

pub const FAKE_TASK_ID: &str = "task-fake-1";
pub const FAKE_REFINE_ID: &str = "task-refine-1";
pub const FAKE_ARTIFACT: &[u8] = b"glTF-binary-bytes";

/// Generator fake driven by a scripted status sequence. The final entry is
/// sticky, so extra polls keep observing the last state.
pub struct FakeGenerator {
    statuses: Mutex<VecDeque<(TaskStatus, Option<u8>)>>,
    pub submitted: Mutex<Vec<SubmitOptions>>,
    pub refines: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(script: impl IntoIterator<Item = (TaskStatus, Option<u8>)>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(script.into_iter().collect()),
            submitted: Mutex::new(Vec::new()),
            refines: Mutex::new(Vec::new()),
        })
    }

    /// A generator whose task has already succeeded with a glb and obj URL.
    pub fn succeeded() -> Arc<Self> {
        Self::new([(TaskStatus::Succeeded, Some(100))])
    }

    fn next_status(&self) -> (TaskStatus, Option<u8>) {
        let mut script = self.statuses.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            *script.front().expect("script must not be empty")
        }
    }
}

#[async_trait]
impl GeneratorApi for FakeGenerator {
    async fn submit_preview(
        &self,
        _image_data_uri: &str,
        options: &SubmitOptions,
    ) -> Result<String, MeshyError> {
        self.submitted.lock().unwrap().push(options.clone());
        Ok(FAKE_TASK_ID.to_string())
    }

    async fn submit_refine(&self, preview_task_id: &str) -> Result<String, MeshyError> {
        self.refines
            .lock()
            .unwrap()
            .push(preview_task_id.to_string());
        Ok(FAKE_REFINE_ID.to_string())
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskStatusResponse, MeshyError> {
        let (status, progress) = self.next_status();
        let model_urls: BTreeMap<String, Option<String>> = if status == TaskStatus::Succeeded {
            [
                (
                    "glb".to_string(),
                    Some("https://generator.test/results/model.glb".to_string()),
                ),
                (
                    "obj".to_string(),
                    Some("https://generator.test/results/model.obj".to_string()),
                ),
            ]
            .into()
        } else {
            BTreeMap::new()
        };
        Ok(TaskStatusResponse {
            id: task_id.to_string(),
            status,
            progress,
            model_urls,
        })
    }

    async fn fetch_artifact(&self, _url: &str) -> Result<Vec<u8>, MeshyError> {
        Ok(FAKE_ARTIFACT.to_vec())
    }
}

// ---------------------------------------------------------------------------
// In-memory blob store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStorage;

#[async_trait]
impl BlobStorage for FakeStorage {
    async fn upload(
        &self,
        _bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        _kind: ResourceKind,
    ) -> Result<StoredFile, StorageError> {
        Ok(stored(filename, folder))
    }

    async fn upload_from_url(
        &self,
        _url: &str,
        filename: &str,
        folder: &str,
        _kind: ResourceKind,
    ) -> Result<StoredFile, StorageError> {
        Ok(stored(filename, folder))
    }

    async fn delete(&self, _storage_id: &str, _kind: ResourceKind) -> Result<(), StorageError> {
        Ok(())
    }
}

fn stored(filename: &str, folder: &str) -> StoredFile {
    StoredFile {
        filename: filename.to_string(),
        url: format!("https://blobs.test/{folder}/{filename}"),
        storage_id: format!("{folder}/{filename}"),
        size_bytes: 1024,
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Short polling budget so `/wait` tests finish in milliseconds.
pub fn test_poll_config() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(5),
        max_attempts: 3,
    }
}

/// Build the full application router over the given pool and generator,
/// mirroring the construction in `main.rs`.
pub fn build_test_app(pool: PgPool, generator: Arc<FakeGenerator>) -> Router {
    let config = test_config();
    let poll = test_poll_config();

    let storage = Arc::new(FakeStorage);
    let catalog = Arc::new(AssetCatalog::new(pool.clone(), storage));

    let generator: Arc<dyn GeneratorApi> = generator;
    let orchestrator = Arc::new(Orchestrator::with_poll_config(generator, poll.clone()));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        catalog,
        orchestrator,
        shutdown: tokio_util::sync::CancellationToken::new(),
    };

    build_app_router(state, &config, &poll)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Parse a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    use http_body_util::BodyExt;
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

// ---------------------------------------------------------------------------
// Multipart helpers
// ---------------------------------------------------------------------------

pub const BOUNDARY: &str = "test-boundary-7f9a2c";

/// Assemble a multipart/form-data body from (name, filename, content) parts.
/// Text fields pass `None` for the filename.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn post_multipart(
    app: Router,
    uri: &str,
    parts: &[(&str, Option<&str>, &[u8])],
) -> Response<Body> {
    let (content_type, body) = multipart_body(parts);
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Assert a JSON error body carries the expected code.
pub fn assert_error_code(json: &serde_json::Value, code: &str) {
    assert_eq!(json["code"], code, "unexpected error body: {json}");
}
