//! Generation task orchestrator.
//!
//! Drives an external image-to-3D job through its lifecycle, hiding the
//! generator's staged/polling nature: submit the preview task, poll on a
//! fixed interval until a terminal state, optionally submit a refine task
//! (polled under the same contract), and resolve a result artifact in a
//! requested format.
//!
//! Each call sequence is independent per task identifier; the orchestrator
//! holds no cross-task mutable state, so concurrent polls for different
//! tasks need no coordination.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio_util::sync::CancellationToken;

use crate::api::GeneratorApi;
use crate::error::MeshyError;
use crate::options::SubmitOptions;
use crate::task::{GenerationTask, ModelFormat, TaskStage, TaskStatus};

// ---------------------------------------------------------------------------
// Polling configuration
// ---------------------------------------------------------------------------

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default attempt ceiling (60 attempts at 5 s = 5-minute budget).
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Tunable parameters for the status polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between consecutive status polls.
    pub interval: Duration,
    /// Upper bound on polls before giving up with
    /// [`MeshyError::PollTimeout`].
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives generation tasks against a [`GeneratorApi`] implementation.
pub struct Orchestrator<A: GeneratorApi> {
    api: A,
    poll: PollConfig,
}

impl<A: GeneratorApi> Orchestrator<A> {
    /// Create an orchestrator with the default polling budget.
    pub fn new(api: A) -> Self {
        Self::with_poll_config(api, PollConfig::default())
    }

    /// Create an orchestrator with an explicit polling budget.
    pub fn with_poll_config(api: A, poll: PollConfig) -> Self {
        Self { api, poll }
    }

    /// Submit an image for preview generation. Returns the task identifier
    /// assigned by the generator.
    ///
    /// Options are normalized first: an out-of-range target polycount is
    /// clamped (not rejected) and the clamped value is what the generator
    /// receives. Submission failures surface as transport/API errors and
    /// are never retried here.
    pub async fn submit_preview_task(
        &self,
        image: &[u8],
        content_type: &str,
        options: SubmitOptions,
    ) -> Result<String, MeshyError> {
        let options = options.normalized();
        let data_uri = format!("data:{content_type};base64,{}", BASE64.encode(image));

        let task_id = self.api.submit_preview(&data_uri, &options).await?;
        tracing::info!(
            task_id = %task_id,
            target_polycount = options.target_polycount,
            "Submitted preview generation task",
        );
        Ok(task_id)
    }

    /// Take a single status probe of a task without waiting.
    pub async fn task_status(
        &self,
        task_id: &str,
        stage: TaskStage,
    ) -> Result<GenerationTask, MeshyError> {
        Ok(self.api.get_task(task_id).await?.into_task(stage))
    }

    /// Poll a task on a fixed interval until it reaches a terminal state.
    ///
    /// Returns the full task snapshot on `SUCCEEDED`; raises
    /// [`MeshyError::TaskFailed`] on a generator-reported failure and
    /// [`MeshyError::PollTimeout`] once the attempt budget is exhausted.
    /// The two are distinct so callers can tell "it broke" from "we
    /// stopped waiting". Progress values, when reported, are relayed
    /// through `on_progress`; that side channel is not part of the return
    /// value.
    ///
    /// The `cancel` token is honoured at every suspend point, so a dropped
    /// client cannot leak an indefinite polling loop.
    pub async fn poll_until_terminal(
        &self,
        task_id: &str,
        stage: TaskStage,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(u8) + Send,
    ) -> Result<GenerationTask, MeshyError> {
        let mut last_status = TaskStatus::Pending;

        for attempt in 1..=self.poll.max_attempts {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(task_id = %task_id, %stage, "Polling cancelled");
                    return Err(MeshyError::Cancelled {
                        task_id: task_id.to_string(),
                    });
                }
                result = self.api.get_task(task_id) => result?,
            };

            let task = response.into_task(stage);
            last_status = task.status;

            match task.status {
                TaskStatus::Succeeded => {
                    tracing::info!(task_id = %task_id, %stage, attempt, "Generation succeeded");
                    return Ok(task);
                }
                TaskStatus::Failed => {
                    tracing::warn!(task_id = %task_id, %stage, attempt, "Generation failed");
                    return Err(MeshyError::TaskFailed {
                        task_id: task_id.to_string(),
                    });
                }
                TaskStatus::Pending | TaskStatus::Generating => {
                    if let Some(progress) = task.progress {
                        on_progress(progress);
                    }
                    tracing::debug!(
                        task_id = %task_id,
                        %stage,
                        attempt,
                        status = ?task.status,
                        progress = ?task.progress,
                        "Task still in progress",
                    );
                }
            }

            // Wait before the next probe, respecting cancellation.
            if attempt < self.poll.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!(task_id = %task_id, %stage, "Polling cancelled");
                        return Err(MeshyError::Cancelled {
                            task_id: task_id.to_string(),
                        });
                    }
                    _ = tokio::time::sleep(self.poll.interval) => {}
                }
            }
        }

        tracing::warn!(
            task_id = %task_id,
            %stage,
            attempts = self.poll.max_attempts,
            last_status = ?last_status,
            "Polling budget exhausted before a terminal state",
        );
        Err(MeshyError::PollTimeout {
            task_id: task_id.to_string(),
            attempts: self.poll.max_attempts,
            last_status,
        })
    }

    /// Submit the optional refine stage for a succeeded preview task.
    ///
    /// The preview task must already be `SUCCEEDED`; otherwise
    /// [`MeshyError::ResultNotReady`] is raised with its current status.
    /// The returned identifier names a new task, polled under the same
    /// [`poll_until_terminal`](Self::poll_until_terminal) contract with
    /// stage [`TaskStage::Refine`]. Skipping refine is always valid; the
    /// preview result stands on its own.
    pub async fn submit_refine_task(&self, preview_task_id: &str) -> Result<String, MeshyError> {
        let preview = self.task_status(preview_task_id, TaskStage::Preview).await?;
        if preview.status != TaskStatus::Succeeded {
            return Err(MeshyError::ResultNotReady {
                task_id: preview_task_id.to_string(),
                status: preview.status,
            });
        }

        let refine_id = self.api.submit_refine(preview_task_id).await?;
        tracing::info!(
            preview_task_id = %preview_task_id,
            refine_task_id = %refine_id,
            "Submitted refine task",
        );
        Ok(refine_id)
    }

    /// Fetch a result artifact in the requested format.
    ///
    /// The task must be `SUCCEEDED` ([`MeshyError::ResultNotReady`]
    /// carrying the current status otherwise) and the format must be
    /// present in its result URLs ([`MeshyError::UnsupportedFormat`]
    /// listing the available formats otherwise; a different format is
    /// never silently substituted). Returns the artifact bytes with the
    /// content type from the fixed format table.
    pub async fn fetch_result(
        &self,
        task_id: &str,
        stage: TaskStage,
        format: ModelFormat,
    ) -> Result<(Vec<u8>, &'static str), MeshyError> {
        let task = self.task_status(task_id, stage).await?;
        if task.status != TaskStatus::Succeeded {
            return Err(MeshyError::ResultNotReady {
                task_id: task_id.to_string(),
                status: task.status,
            });
        }

        let url = task
            .model_urls
            .get(&format)
            .ok_or_else(|| MeshyError::UnsupportedFormat {
                task_id: task_id.to_string(),
                requested: format.to_string(),
                available: task.available_formats(),
            })?;

        let bytes = self.api.fetch_artifact(url).await?;
        tracing::info!(
            task_id = %task_id,
            %format,
            size_bytes = bytes.len(),
            "Fetched result artifact",
        );
        Ok((bytes, format.content_type()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::TaskStatusResponse;
    use crate::options::{SymmetryMode, MAX_TARGET_POLYCOUNT, MIN_TARGET_POLYCOUNT};

    /// Scripted generator: pops a status per poll (sticking on the last
    /// one once the script runs out) and records submitted payloads.
    struct ScriptedApi {
        statuses: Mutex<VecDeque<(TaskStatus, Option<u8>)>>,
        last_status: Mutex<(TaskStatus, Option<u8>)>,
        model_urls: BTreeMap<String, Option<String>>,
        submitted_options: Mutex<Vec<SubmitOptions>>,
        submitted_payloads: Mutex<Vec<String>>,
        refines: Mutex<Vec<String>>,
        polls: Mutex<u32>,
    }

    impl ScriptedApi {
        fn new(script: impl IntoIterator<Item = (TaskStatus, Option<u8>)>) -> Self {
            Self {
                statuses: Mutex::new(script.into_iter().collect()),
                last_status: Mutex::new((TaskStatus::Pending, None)),
                model_urls: BTreeMap::new(),
                submitted_options: Mutex::new(Vec::new()),
                submitted_payloads: Mutex::new(Vec::new()),
                refines: Mutex::new(Vec::new()),
                polls: Mutex::new(0),
            }
        }

        fn with_urls(mut self, urls: &[(&str, &str)]) -> Self {
            self.model_urls = urls
                .iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect();
            self
        }

        fn poll_count(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GeneratorApi for ScriptedApi {
        async fn submit_preview(
            &self,
            image_data_uri: &str,
            options: &SubmitOptions,
        ) -> Result<String, MeshyError> {
            self.submitted_options.lock().unwrap().push(options.clone());
            self.submitted_payloads
                .lock()
                .unwrap()
                .push(image_data_uri.to_string());
            Ok("task-preview".to_string())
        }

        async fn submit_refine(&self, preview_task_id: &str) -> Result<String, MeshyError> {
            self.refines.lock().unwrap().push(preview_task_id.to_string());
            Ok("task-refine".to_string())
        }

        async fn get_task(&self, task_id: &str) -> Result<TaskStatusResponse, MeshyError> {
            *self.polls.lock().unwrap() += 1;
            let (status, progress) = {
                let mut script = self.statuses.lock().unwrap();
                match script.pop_front() {
                    Some(next) => {
                        *self.last_status.lock().unwrap() = next;
                        next
                    }
                    None => *self.last_status.lock().unwrap(),
                }
            };
            Ok(TaskStatusResponse {
                id: task_id.to_string(),
                status,
                progress,
                model_urls: self.model_urls.clone(),
            })
        }

        async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, MeshyError> {
            Ok(url.as_bytes().to_vec())
        }
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            interval: Duration::ZERO,
            max_attempts: 10,
        }
    }

    // -- Submission --

    #[tokio::test]
    async fn submit_clamps_polycount_in_sent_payload() {
        let api = ScriptedApi::new([]);
        let orchestrator = Orchestrator::new(api);

        let options = SubmitOptions {
            target_polycount: 9_999_999,
            ..Default::default()
        };
        orchestrator
            .submit_preview_task(b"img", "image/png", options)
            .await
            .unwrap();

        let sent = orchestrator.api.submitted_options.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target_polycount, MAX_TARGET_POLYCOUNT);
    }

    #[tokio::test]
    async fn submit_clamps_polycount_up_to_lower_bound() {
        let api = ScriptedApi::new([]);
        let orchestrator = Orchestrator::new(api);

        let options = SubmitOptions {
            target_polycount: 1,
            ..Default::default()
        };
        orchestrator
            .submit_preview_task(b"img", "image/png", options)
            .await
            .unwrap();

        let sent = orchestrator.api.submitted_options.lock().unwrap();
        assert_eq!(sent[0].target_polycount, MIN_TARGET_POLYCOUNT);
    }

    #[tokio::test]
    async fn submit_encodes_image_as_data_uri() {
        let api = ScriptedApi::new([]);
        let orchestrator = Orchestrator::new(api);

        orchestrator
            .submit_preview_task(b"dog photo", "image/jpeg", SubmitOptions::default())
            .await
            .unwrap();

        let payloads = orchestrator.api.submitted_payloads.lock().unwrap();
        assert!(payloads[0].starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn unrecognized_symmetry_defaults_to_auto() {
        let api = ScriptedApi::new([]);
        let orchestrator = Orchestrator::new(api);

        let options = SubmitOptions {
            symmetry_mode: SymmetryMode::from_param("diagonal"),
            ..Default::default()
        };
        orchestrator
            .submit_preview_task(b"img", "image/png", options)
            .await
            .unwrap();

        let sent = orchestrator.api.submitted_options.lock().unwrap();
        assert_eq!(sent[0].symmetry_mode, SymmetryMode::Auto);
    }

    // -- Polling --

    #[tokio::test]
    async fn poll_returns_on_third_probe() {
        let api = ScriptedApi::new([
            (TaskStatus::Generating, Some(20)),
            (TaskStatus::Generating, Some(70)),
            (TaskStatus::Succeeded, Some(100)),
        ])
        .with_urls(&[("glb", "https://assets.example/model.glb")]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let mut seen = Vec::new();
        let task = orchestrator
            .poll_until_terminal(
                "task-1",
                TaskStage::Preview,
                &CancellationToken::new(),
                |p| seen.push(p),
            )
            .await
            .unwrap();

        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(orchestrator.api.poll_count(), 3);
        // Progress is a side channel, relayed per non-terminal poll.
        assert_eq!(seen, vec![20, 70]);
        assert_eq!(task.available_formats(), vec!["glb"]);
    }

    #[tokio::test]
    async fn poll_budget_exhaustion_is_timeout_not_failure() {
        // Script never leaves GENERATING.
        let api = ScriptedApi::new([(TaskStatus::Generating, Some(50))]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let err = orchestrator
            .poll_until_terminal(
                "task-stuck",
                TaskStage::Preview,
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap_err();

        match err {
            MeshyError::PollTimeout {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(attempts, 10);
                assert_eq!(last_status, TaskStatus::Generating);
            }
            other => panic!("expected PollTimeout, got {other:?}"),
        }
        assert_eq!(orchestrator.api.poll_count(), 10);
    }

    #[tokio::test]
    async fn poll_surfaces_generator_reported_failure() {
        let api = ScriptedApi::new([
            (TaskStatus::Generating, None),
            (TaskStatus::Failed, None),
        ]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let err = orchestrator
            .poll_until_terminal(
                "task-bad",
                TaskStage::Refine,
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, MeshyError::TaskFailed { ref task_id } if task_id == "task-bad"));
    }

    #[tokio::test]
    async fn poll_stops_promptly_on_cancellation() {
        let api = ScriptedApi::new([(TaskStatus::Generating, None)]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator
            .poll_until_terminal("task-1", TaskStage::Preview, &cancel, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, MeshyError::Cancelled { .. }));
        assert_eq!(orchestrator.api.poll_count(), 0);
    }

    // -- Refine --

    #[tokio::test]
    async fn refine_requires_succeeded_preview() {
        let api = ScriptedApi::new([(TaskStatus::Generating, Some(10))]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let err = orchestrator.submit_refine_task("task-1").await.unwrap_err();
        assert!(matches!(
            err,
            MeshyError::ResultNotReady {
                status: TaskStatus::Generating,
                ..
            }
        ));
        assert!(orchestrator.api.refines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refine_yields_new_task_id() {
        let api = ScriptedApi::new([(TaskStatus::Succeeded, Some(100))]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let refine_id = orchestrator.submit_refine_task("task-1").await.unwrap();
        assert_eq!(refine_id, "task-refine");
        assert_eq!(
            orchestrator.api.refines.lock().unwrap().as_slice(),
            &["task-1".to_string()]
        );
    }

    // -- Result fetching --

    #[tokio::test]
    async fn fetch_result_before_success_is_not_ready() {
        let api = ScriptedApi::new([(TaskStatus::Pending, None)]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let err = orchestrator
            .fetch_result("task-1", TaskStage::Preview, ModelFormat::Glb)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MeshyError::ResultNotReady {
                status: TaskStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fetch_result_unsupported_format_lists_available() {
        let api = ScriptedApi::new([(TaskStatus::Succeeded, Some(100))])
            .with_urls(&[("glb", "https://assets.example/model.glb")]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let err = orchestrator
            .fetch_result("task-1", TaskStage::Preview, ModelFormat::Obj)
            .await
            .unwrap_err();

        match err {
            MeshyError::UnsupportedFormat {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, "obj");
                assert_eq!(available, vec!["glb"]);
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_result_tags_correct_content_type() {
        let api = ScriptedApi::new([(TaskStatus::Succeeded, Some(100))])
            .with_urls(&[("glb", "https://assets.example/model.glb")]);
        let orchestrator = Orchestrator::with_poll_config(api, fast_poll());

        let (bytes, content_type) = orchestrator
            .fetch_result("task-1", TaskStage::Preview, ModelFormat::Glb)
            .await
            .unwrap();

        assert_eq!(content_type, "model/gltf-binary");
        assert_eq!(bytes, b"https://assets.example/model.glb");
    }
}
