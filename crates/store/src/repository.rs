//! The async seam between the engine and whatever holds session state.

use async_trait::async_trait;
use storyloom_core::{MacroChain, SessionContext};

use crate::error::StoreError;

/// Load/save access to session records, plus the legacy chain store.
///
/// The engine performs every mutation as one read-modify-write cycle
/// against this trait while holding the session's mutex. Implementations
/// must make `save` atomic: a crash mid-write may lose the newest version
/// of a record but must never leave a torn one behind.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load a session, or `None` if it was never saved.
    async fn load(&self, session_id: &str) -> Result<Option<SessionContext>, StoreError>;

    /// Persist a whole session record.
    async fn save(&self, session: &SessionContext) -> Result<(), StoreError>;

    /// Look up a chain in the standalone legacy chain store.
    ///
    /// Early records kept chains outside the session. Lock operations fall
    /// back to this store before reporting NotFound and copy the chain into
    /// the session on the way through.
    async fn load_legacy_chain(&self, chain_id: &str) -> Result<Option<MacroChain>, StoreError>;
}
