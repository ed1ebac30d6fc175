/// Domain-level error taxonomy.
///
/// Every failure here is local and synchronous: the operation that raised it
/// performed no partial mutation (guards run before any write), so callers
/// may safely discard the in-memory aggregate and report the error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced session, chain, scene, or character does not exist.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The block type is outside the relevant allow-list.
    #[error("Invalid block type: {0}")]
    InvalidBlockType(String),

    /// Guard violation: a strict lock transition targeted an entity that is
    /// already locked.
    #[error("{entity} {id} is already locked")]
    AlreadyLocked { entity: &'static str, id: String },

    /// Guard violation: an unlock (or an operation requiring a lock)
    /// targeted an entity that is not locked.
    #[error("{entity} {id} is not locked")]
    NotLocked { entity: &'static str, id: String },

    /// An operation depends on upstream state whose recorded versions no
    /// longer match the current ledger. The message enumerates exactly
    /// which of background/characters moved.
    #[error("Stale context: {0}")]
    StaleContext(String),

    /// A loaded session record is missing both `blocks` and `macroChains`.
    /// Missing substructures are normally reconstructed with defaults, but
    /// losing both at once is treated as a corrupted read rather than a
    /// legitimately empty session.
    #[error("Corrupt session record {session_id}: {reason}")]
    CorruptRecord { session_id: String, reason: String },

    /// Validation failed on an input payload.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Shorthand for the common not-found construction.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
