//! Engine-level errors.

use thiserror::Error;

use storyloom_core::CoreError;
use storyloom_store::StoreError;

/// Failures surfaced by engine operations.
///
/// Domain failures keep their [`CoreError`] shape so an outer layer can
/// map them onto response codes (NotFound, AlreadyLocked, StaleContext
/// and so on); infrastructure failures are wrapped as `Storage`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}
