//! Structured error types for the sampler pipeline.
//!
//! Split along the fault taxonomy: configuration problems fail `start()`
//! synchronously, capture faults are logged and counted but never abort a
//! running session, and export faults degrade single entries rather than
//! the whole snapshot.

use thiserror::Error;

/// Errors reported synchronously by `SamplerBuilder::start`.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("specific thread selection is empty")]
    EmptyThreadSelection,

    #[error("platform offers no capture backend")]
    UnsupportedPlatform,
}

/// A single thread-dump attempt failed.
///
/// Never fatal to a session: the owning tick logs it, bumps a counter and
/// moves on. Per-thread gaps are not errors at all — backends simply omit
/// the thread.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture backend '{backend}' failed: {reason}")]
    BackendFailed { backend: &'static str, reason: String },

    #[error("capture exceeded the {budget_ms}ms budget")]
    BudgetExceeded { budget_ms: u64 },
}

/// Errors surfaced while writing a snapshot out.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
