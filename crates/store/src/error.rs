//! Store-level errors.

use thiserror::Error;

/// Anything that can go wrong between the engine and the data files.
///
/// Domain errors pass through transparently so callers can match on
/// [`storyloom_core::CoreError`] without caring which layer raised it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] storyloom_core::CoreError),
}
