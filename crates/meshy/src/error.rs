//! Error taxonomy for the generation task orchestrator.
//!
//! Every variant carries enough context (task id, last known status,
//! available formats) for the caller to render a precise message. Nothing
//! in this crate retries automatically; all failures propagate typed.

use crate::task::TaskStatus;

/// Errors from the Meshy client and orchestrator layers.
#[derive(Debug, thiserror::Error)]
pub enum MeshyError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("generator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The generator returned a non-2xx status code.
    #[error("generator API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The generator reported the task as terminally failed.
    #[error("generation task {task_id} failed")]
    TaskFailed { task_id: String },

    /// The polling attempt budget ran out before a terminal state.
    ///
    /// Distinct from [`MeshyError::TaskFailed`]: the generator never
    /// reported failure, we simply stopped waiting.
    #[error("task {task_id} still {last_status:?} after {attempts} polls")]
    PollTimeout {
        task_id: String,
        attempts: u32,
        last_status: TaskStatus,
    },

    /// A result was requested before the task succeeded.
    #[error("task {task_id} has no result yet (status: {status:?})")]
    ResultNotReady {
        task_id: String,
        status: TaskStatus,
    },

    /// The requested format is not among the task's result URLs.
    #[error("format '{requested}' not available for task {task_id}; available: {available:?}")]
    UnsupportedFormat {
        task_id: String,
        requested: String,
        available: Vec<String>,
    },

    /// The caller's cancellation token fired while polling.
    #[error("polling for task {task_id} was cancelled")]
    Cancelled { task_id: String },
}
