//! Meshy image-to-3D client library.
//!
//! Wraps the external Meshy generation API behind a typed REST client and
//! an orchestrator that drives a task through its lifecycle: submit the
//! preview stage, poll to a terminal state, optionally submit a refine
//! stage, and fetch the resulting artifact in a requested format.

pub mod api;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod task;

pub use api::{GeneratorApi, MeshyApi};
pub use error::MeshyError;
pub use options::{SubmitOptions, SymmetryMode, Topology};
pub use orchestrator::{Orchestrator, PollConfig};
pub use task::{GenerationTask, ModelFormat, TaskStage, TaskStatus};
