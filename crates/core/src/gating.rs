//! Generation gates: what must already be locked before each pipeline
//! stage may produce content.
//!
//! The lock layer itself never gates on content existing; these checks
//! belong to the generation path. Characters need a locked background,
//! chains need both gate-keeping blocks locked, and scene details need a
//! locked chain plus, past the opening scene, scene N-1's detail locked.

use crate::block::BlockType;
use crate::context::SessionContext;
use crate::error::CoreError;

/// A block gate passes only when the block both exists with content and
/// is locked.
fn ensure_block_gate(session: &SessionContext, kind: BlockType) -> Result<(), CoreError> {
    if !session.has_block(kind) || !session.block_locked(kind) {
        return Err(CoreError::NotLocked {
            entity: "context block",
            id: kind.as_str().to_string(),
        });
    }
    Ok(())
}

/// Character generation requires a locked background.
pub fn ensure_characters_generation_allowed(session: &SessionContext) -> Result<(), CoreError> {
    ensure_block_gate(session, BlockType::Background)
}

/// Chain generation requires both gate-keeping blocks locked.
pub fn ensure_chain_generation_allowed(session: &SessionContext) -> Result<(), CoreError> {
    ensure_block_gate(session, BlockType::Background)?;
    ensure_block_gate(session, BlockType::Characters)
}

/// Where a scene sits in its chain, resolved while checking its gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePlacement {
    pub chain_id: String,
    pub order: u32,
    pub title: String,
    pub objective: String,
    /// The locked predecessor's detail id and version, when there is one.
    /// Witness stamps record it so edits to the predecessor are detectable.
    pub prev_scene: Option<(String, u64)>,
}

/// Scene-detail generation requires the slot to exist in a `Locked` chain
/// and, past the opening scene, the previous slot's detail to be `Locked`.
///
/// `Locked` is the only status that unblocks dependents; a chain that is
/// merely generated or under edit has no final shape to build details on.
pub fn ensure_scene_generation_allowed(
    session: &SessionContext,
    scene_id: &str,
) -> Result<ScenePlacement, CoreError> {
    let (chain_id, slot) = session
        .scene_slot(scene_id)
        .ok_or_else(|| CoreError::not_found("macro scene", scene_id))?;
    if !session.chain_locked(chain_id) {
        return Err(CoreError::NotLocked {
            entity: "macro chain",
            id: chain_id.to_string(),
        });
    }

    let mut prev_scene = None;
    if slot.order > 1 {
        let chain = session.chain(chain_id).ok_or_else(|| {
            CoreError::not_found("macro chain", chain_id)
        })?;
        let prev_slot = chain
            .scenes
            .iter()
            .find(|s| s.order == slot.order - 1)
            .ok_or_else(|| CoreError::Validation(format!(
                "scene {scene_id} has no predecessor at order {}",
                slot.order - 1
            )))?;
        let prev_detail = session.scene_detail(&prev_slot.id).ok_or_else(|| {
            CoreError::NotLocked {
                entity: "scene detail",
                id: prev_slot.id.clone(),
            }
        })?;
        if !prev_detail.status.unblocks_dependents() {
            return Err(CoreError::NotLocked {
                entity: "scene detail",
                id: prev_slot.id.clone(),
            });
        }
        prev_scene = Some((prev_slot.id.clone(), prev_detail.version));
    }

    Ok(ScenePlacement {
        chain_id: chain_id.to_string(),
        order: slot.order,
        title: slot.title.clone(),
        objective: slot.objective.clone(),
        prev_scene,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
