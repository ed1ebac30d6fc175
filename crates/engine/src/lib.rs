//! Storyloom engine: the operation surface over the domain core and the
//! session store.
//!
//! Every operation here follows the same shape: acquire the session's
//! mutex, load the aggregate, run the domain rules against it, save, log.
//! Outer layers (HTTP handlers, the generation collaborator that talks to
//! a model) call these operations and never touch the store directly.
//!
//! - [`sessions`] — session lifecycle: fetch-or-create, block appends,
//!   clears, the health summary.
//! - [`characters`] — the character roster: generation gate and plan,
//!   recording, per-entry edits.
//! - [`locks`] — lock transitions for blocks, chains and scenes, plus the
//!   invalidation they fan out.
//! - [`generation`] — gates and recorders for generated chains and scene
//!   details, plus freshness checks.
//! - [`scenes`] — manual editing: scene and chain edits with trivial-edit
//!   suppression, scene deletion.

use std::sync::Arc;

use storyloom_core::{CoreError, SessionContext};
use storyloom_store::{SessionLocks, SessionRepository, StoreError};

pub mod characters;
pub mod error;
pub mod generation;
pub mod locks;
pub mod scenes;
pub mod sessions;

pub use characters::{CharacterPlan, RosterReport};
pub use error::EngineError;
pub use generation::{RecordedChain, RecordedScene, SceneFreshness};
pub use locks::{BlockLockReport, ChainLockReport, PropagationOutcome, SceneLockReport};
pub use scenes::{ChainEditReport, SceneDeleteReport, SceneEdit, SceneEditReport, SceneSlotEdit};
pub use sessions::HealthReport;

/// The operation surface for one deployment: a repository plus the
/// per-session mutexes guarding it.
///
/// Cheap to clone and share; all state lives behind [`Arc`]s.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn SessionRepository>,
    locks: SessionLocks,
}

impl Engine {
    pub fn new(store: Arc<dyn SessionRepository>) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
        }
    }

    /// Load a session that must already exist.
    pub(crate) async fn load_required(
        &self,
        session_id: &str,
    ) -> Result<SessionContext, EngineError> {
        match self.store.load(session_id).await? {
            Some(session) => Ok(session),
            None => Err(CoreError::not_found("session", session_id).into()),
        }
    }

    /// Load a session or start a fresh one at the zero state. The fresh
    /// session is only persisted if the operation that follows saves it.
    pub(crate) async fn load_or_create(
        &self,
        session_id: &str,
    ) -> Result<(SessionContext, bool), EngineError> {
        match self.store.load(session_id).await? {
            Some(session) => Ok((session, false)),
            None => Ok((SessionContext::new(session_id), true)),
        }
    }

    pub(crate) async fn save(&self, session: &SessionContext) -> Result<(), EngineError> {
        self.store.save(session).await?;
        Ok(())
    }

    pub(crate) fn store(&self) -> &dyn SessionRepository {
        self.store.as_ref()
    }

    pub(crate) fn session_locks(&self) -> &SessionLocks {
        &self.locks
    }
}

// Domain errors raised inside the store (corrupt records, not-found
// projects) surface with their CoreError shape instead of hiding behind
// a storage wrapper.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => EngineError::Core(core),
            other => EngineError::Storage(other),
        }
    }
}
