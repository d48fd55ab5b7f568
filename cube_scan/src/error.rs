// THEORY:
// Every operation the scanner exposes returns an explicit result. The failure kinds
// are few and each one tells the caller what to do next: retry the capture, re-aim
// the cube, re-scan a face, or start over. None of them is ever swallowed or
// replaced by a guessed value further down the stack.

use crate::core_modules::color_classifier::ColorCode;
use crate::core_modules::scan_session::PositionLabel;
use thiserror::Error;

/// Result type used across the scanning core.
pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// No frame could be read from the capture source. Retrying is expected to help.
    #[error("capture failure: {0}")]
    CaptureFailure(String),

    /// One or more grid cells could not be classified; nothing was committed.
    #[error("unrecognised color in cell(s) {cells:?}; improve the lighting and retry")]
    UnknownColorDetected { cells: Vec<usize> },

    /// All six faces are already captured.
    #[error("all six faces have been scanned")]
    SessionComplete,

    /// Undo was requested with no faces captured.
    #[error("no scanned face to undo")]
    NothingToUndo,

    /// Translation was requested before all six faces were captured.
    #[error("only {captured} of 6 faces scanned")]
    SessionIncomplete { captured: usize },

    /// Two faces share the same center sticker color.
    #[error("faces {first} and {second} share the center color {color}; re-scan them")]
    DuplicateCenterColor {
        color: ColorCode,
        first: PositionLabel,
        second: PositionLabel,
    },

    /// The solving engine rejected the facelet string.
    #[error("unsolvable cube configuration: {0}")]
    UnsolvableConfiguration(String),

    /// The solving engine could not be run at all.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(String),
}

impl ScanError {
    /// Stable snake_case tag for the failure kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::CaptureFailure(_) => "capture_failure",
            ScanError::UnknownColorDetected { .. } => "unknown_color_detected",
            ScanError::SessionComplete => "session_complete",
            ScanError::NothingToUndo => "nothing_to_undo",
            ScanError::SessionIncomplete { .. } => "session_incomplete",
            ScanError::DuplicateCenterColor { .. } => "duplicate_center_color",
            ScanError::UnsolvableConfiguration(_) => "unsolvable_configuration",
            ScanError::SolverUnavailable(_) => "solver_unavailable",
        }
    }

    /// `SessionComplete` and `NothingToUndo` report state rather than a fault.
    pub fn is_informational(&self) -> bool {
        matches!(self, ScanError::SessionComplete | ScanError::NothingToUndo)
    }
}
