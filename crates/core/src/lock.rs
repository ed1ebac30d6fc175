//! Lock and unlock transitions for blocks, chains and scene details.
//!
//! This module is the only place lock state changes. Context blocks use a
//! boolean flag and are idempotent; chains and scenes run a status machine
//! with strict guards, because their dependents must observe exactly one
//! lock transition per version bump.
//!
//! Ledger bumps happen here and nowhere else: a gate-keeping block's
//! counter moves exactly once per unlocked-to-locked transition. Re-locking
//! an already locked block, unlocking, and appending content never move it.

use crate::block::BlockType;
use crate::context::SessionContext;
use crate::error::CoreError;
use crate::invalidation::{invalidate_all_scenes, invalidate_later_locked_scenes};
use crate::status::ArtifactStatus;
use crate::types::now;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a context-block lock call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLockOutcome {
    pub block_type: BlockType,
    pub locked: bool,
    /// Whether the flag actually changed (the call was not idempotent).
    pub transitioned: bool,
    /// Whether a ledger counter moved; the caller owes a downstream
    /// invalidation pass when this is set.
    pub ledger_bumped: bool,
}

/// Result of a chain lock call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLockOutcome {
    pub chain_id: String,
    pub status: ArtifactStatus,
    /// Scene details demoted to `NeedsRegen` by an unlock.
    pub affected_scenes: Vec<String>,
}

/// Result of a scene lock call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLockOutcome {
    pub scene_id: String,
    pub status: ArtifactStatus,
    /// Later locked scenes demoted to `NeedsRegen` by an unlock.
    pub affected_scenes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Context blocks
// ---------------------------------------------------------------------------

/// Set a context block's lock flag.
///
/// Idempotent at this layer: re-locking a locked block or re-unlocking an
/// unlocked one is permitted and still counts as a session mutation. The
/// ledger only moves on an actual unlocked-to-locked transition of
/// `background` or `characters`; unlocking never bumps anything, content
/// is only "new" once it is re-locked.
pub fn lock_context_block(
    session: &mut SessionContext,
    kind: BlockType,
    locked: bool,
) -> Result<BlockLockOutcome, CoreError> {
    kind.ensure_lockable()?;
    let previous = session.block_locked(kind);
    session.locks.insert(kind.as_str().to_string(), locked);

    let mut ledger_bumped = false;
    if locked && !previous {
        match kind {
            BlockType::Background => {
                session.meta.bump_background();
                ledger_bumped = true;
            }
            BlockType::Characters => {
                session.meta.bump_characters();
                ledger_bumped = true;
            }
            _ => {}
        }
    }

    // The characters roster carries its own locked/lockedAt mirror for the
    // read path; keep it consistent with the authoritative locks map.
    if kind == BlockType::Characters {
        if let Some(serde_json::Value::Object(payload)) =
            session.blocks.get_mut(BlockType::Characters.as_str())
        {
            payload.insert("locked".to_string(), serde_json::Value::Bool(locked));
            let stamp = if locked {
                serde_json::Value::String(now().to_rfc3339())
            } else {
                serde_json::Value::Null
            };
            payload.insert("lockedAt".to_string(), stamp);
        }
    }

    session.bump_version();
    Ok(BlockLockOutcome {
        block_type: kind,
        locked,
        transitioned: previous != locked,
        ledger_bumped,
    })
}

// ---------------------------------------------------------------------------
// Macro chains
// ---------------------------------------------------------------------------

/// Lock or unlock a macro chain.
///
/// Locking an already-`Locked` chain fails with [`CoreError::AlreadyLocked`];
/// unlocking a chain in any other status fails with [`CoreError::NotLocked`].
/// Unlocking lands on `Edited` and demotes every scene detail in the
/// session to `NeedsRegen`, since all of them assumed the chain's shape.
pub fn lock_macro_chain(
    session: &mut SessionContext,
    chain_id: &str,
    locked: bool,
) -> Result<ChainLockOutcome, CoreError> {
    let status = {
        let chain = session
            .chain_mut(chain_id)
            .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
        ensure_lock_transition("macro chain", chain_id, chain.status, locked)?;
        if locked {
            chain.status = ArtifactStatus::Locked;
            chain.locked_at = Some(now());
        } else {
            chain.status = ArtifactStatus::Edited;
            chain.locked_at = None;
        }
        chain.version += 1;
        chain.touch();
        chain.status
    };

    let affected_scenes = if locked {
        Vec::new()
    } else {
        invalidate_all_scenes(session)
    };

    session.bump_version();
    Ok(ChainLockOutcome {
        chain_id: chain_id.to_string(),
        status,
        affected_scenes,
    })
}

// ---------------------------------------------------------------------------
// Scene details
// ---------------------------------------------------------------------------

/// Lock or unlock a scene detail.
///
/// Same guards as chains. Unlocking lands on `Edited` and demotes only
/// later, currently-`Locked` scenes; earlier scenes never depended on this
/// one. Folding the newly locked scene's `contextOut` into the shared
/// blocks is the caller's job, in the same save as this transition.
pub fn lock_scene(
    session: &mut SessionContext,
    scene_id: &str,
    locked: bool,
) -> Result<SceneLockOutcome, CoreError> {
    let (status, sequence) = {
        let detail = session
            .scene_detail_mut(scene_id)
            .ok_or_else(|| CoreError::not_found("scene detail", scene_id))?;
        ensure_lock_transition("scene detail", scene_id, detail.status, locked)?;
        if locked {
            detail.status = ArtifactStatus::Locked;
            detail.locked_at = Some(now());
        } else {
            detail.status = ArtifactStatus::Edited;
            detail.locked_at = None;
        }
        detail.version += 1;
        detail.touch();
        (detail.status, detail.sequence)
    };

    let affected_scenes = if locked {
        Vec::new()
    } else {
        invalidate_later_locked_scenes(session, sequence)
    };

    session.bump_version();
    Ok(SceneLockOutcome {
        scene_id: scene_id.to_string(),
        status,
        affected_scenes,
    })
}

/// Shared guard: lock requests fail on `Locked`, unlock requests fail on
/// anything but `Locked`.
fn ensure_lock_transition(
    entity: &'static str,
    id: &str,
    status: ArtifactStatus,
    locked: bool,
) -> Result<(), CoreError> {
    match (locked, status.is_locked()) {
        (true, true) => Err(CoreError::AlreadyLocked {
            entity,
            id: id.to_string(),
        }),
        (false, false) => Err(CoreError::NotLocked {
            entity,
            id: id.to_string(),
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
