//! Submission options for the preview generation stage.
//!
//! Normalization is lenient by design: an out-of-range target polycount is
//! clamped to the nearest bound rather than rejected, and an unrecognized
//! symmetry mode falls back to `auto`. Both cases are logged at warn.

use serde::{Deserialize, Serialize};

/// Lowest target polycount the generator accepts.
pub const MIN_TARGET_POLYCOUNT: u32 = 100;
/// Highest target polycount the generator accepts.
pub const MAX_TARGET_POLYCOUNT: u32 = 300_000;
/// Default target polycount when the caller does not specify one.
pub const DEFAULT_TARGET_POLYCOUNT: u32 = 30_000;

/// Mesh topology requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Triangle,
    Quad,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Triangle => "triangle",
            Topology::Quad => "quad",
        }
    }
}

/// Symmetry handling requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryMode {
    Off,
    #[default]
    Auto,
    On,
}

impl SymmetryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SymmetryMode::Off => "off",
            SymmetryMode::Auto => "auto",
            SymmetryMode::On => "on",
        }
    }

    /// Parse a user-supplied mode, falling back to `auto` on anything
    /// outside the enumerated set.
    pub fn from_param(value: &str) -> SymmetryMode {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => SymmetryMode::Off,
            "auto" => SymmetryMode::Auto,
            "on" => SymmetryMode::On,
            other => {
                tracing::warn!(mode = other, "Unknown symmetry mode, falling back to auto");
                SymmetryMode::Auto
            }
        }
    }
}

/// Configuration for a preview submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOptions {
    pub topology: Topology,
    pub should_texture: bool,
    pub symmetry_mode: SymmetryMode,
    /// Only meaningful when `should_texture` is set.
    pub enable_pbr: bool,
    pub target_polycount: u32,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            should_texture: true,
            symmetry_mode: SymmetryMode::default(),
            enable_pbr: false,
            target_polycount: DEFAULT_TARGET_POLYCOUNT,
        }
    }
}

impl SubmitOptions {
    /// Return a copy with the target polycount clamped to the accepted
    /// range. Clamping instead of rejecting is deliberate; the clamped
    /// value is what gets sent to the generator.
    pub fn normalized(mut self) -> Self {
        let clamped = self
            .target_polycount
            .clamp(MIN_TARGET_POLYCOUNT, MAX_TARGET_POLYCOUNT);
        if clamped != self.target_polycount {
            tracing::warn!(
                requested = self.target_polycount,
                clamped,
                "Target polycount out of range, clamping",
            );
            self.target_polycount = clamped;
        }
        self
    }
}
