//! Task, status, and result-format types for the generation pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stage and status
// ---------------------------------------------------------------------------

/// Which phase of generation a task represents.
///
/// Every task starts as a preview; refinement is an optional second task
/// with its own identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStage {
    Preview,
    Refine,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStage::Preview => write!(f, "preview"),
            TaskStage::Refine => write!(f, "refine"),
        }
    }
}

/// Lifecycle state reported by the generator.
///
/// `PENDING -> GENERATING -> {SUCCEEDED | FAILED}`; the terminal states are
/// final for a given task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Generating,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// True for `SUCCEEDED` and `FAILED`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Result formats
// ---------------------------------------------------------------------------

/// A downloadable artifact format the generator may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Glb,
    Gltf,
    Obj,
    Fbx,
    Usdz,
}

impl ModelFormat {
    /// All formats the pipeline knows about.
    pub const ALL: &'static [ModelFormat] = &[
        ModelFormat::Glb,
        ModelFormat::Gltf,
        ModelFormat::Obj,
        ModelFormat::Fbx,
        ModelFormat::Usdz,
    ];

    /// Lowercase wire name, as used in the generator's `model_urls` map.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFormat::Glb => "glb",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Obj => "obj",
            ModelFormat::Fbx => "fbx",
            ModelFormat::Usdz => "usdz",
        }
    }

    /// Content type served when proxying an artifact of this format.
    pub fn content_type(self) -> &'static str {
        match self {
            ModelFormat::Glb => "model/gltf-binary",
            ModelFormat::Gltf => "model/gltf+json",
            ModelFormat::Obj => "text/plain",
            ModelFormat::Fbx => "application/octet-stream",
            ModelFormat::Usdz => "model/vnd.usdz+zip",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glb" => Ok(ModelFormat::Glb),
            "gltf" => Ok(ModelFormat::Gltf),
            "obj" => Ok(ModelFormat::Obj),
            "fbx" => Ok(ModelFormat::Fbx),
            "usdz" => Ok(ModelFormat::Usdz),
            other => Err(format!("unknown model format '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Task snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of a generation task.
///
/// `model_urls` is populated only once the task has succeeded; the
/// orchestrator never serves a result URL taken from a non-terminal poll.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationTask {
    /// Opaque identifier assigned by the generator on submission.
    pub id: String,
    pub stage: TaskStage,
    pub status: TaskStatus,
    /// Completion percentage, when the generator reports one.
    pub progress: Option<u8>,
    /// Format name -> fetchable URL, present only on success.
    pub model_urls: BTreeMap<ModelFormat, String>,
}

impl GenerationTask {
    /// Result formats available for this task, in stable order.
    pub fn available_formats(&self) -> Vec<String> {
        self.model_urls.keys().map(|f| f.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
