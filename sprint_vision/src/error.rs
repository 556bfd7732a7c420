use thiserror::Error;

/// Every failure the sprint engine can report.
///
/// `DimensionMismatch` and `NotRunning` are precondition guards: the session state
/// machine never lets them happen, so seeing one means an invariant was broken.
/// `CaptureFailure` is the only runtime condition, and the engine absorbs it as a
/// skipped tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("frame size changed between comparisons: previous {previous:?}, current {current:?}")]
    DimensionMismatch {
        previous: (u32, u32),
        current: (u32, u32),
    },

    #[error("sprint timer stopped while not running")]
    NotRunning,

    #[error("frame capture failed: {0}")]
    CaptureFailure(String),

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrame { expected: usize, actual: usize },

    #[error("detection zone cannot change while the timer is running")]
    ZoneLocked,

    #[error("frame source is not ready; start the camera first")]
    NotActive,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
