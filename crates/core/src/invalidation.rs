//! Soft invalidation cascades.
//!
//! Invalidation never deletes content. It flips `status` to `NeedsRegen`
//! and refreshes `lastUpdatedAt`, so the stale artifact stays visible and
//! editable until it is regenerated. Cascades only ever run forward:
//! editing stage N touches stages strictly after N, never before.

use crate::context::SessionContext;
use crate::scene::SceneDetail;
use crate::status::ArtifactStatus;

// ---------------------------------------------------------------------------
// Upstream change kinds
// ---------------------------------------------------------------------------

/// What changed upstream of the artifacts being invalidated. Carried in
/// reports and log lines; every kind invalidates the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamChange {
    /// The background block was re-locked after an edit.
    Background,
    /// The characters block was re-locked after an edit.
    Characters,
    /// A macro chain was unlocked, so its shape is no longer guaranteed.
    ChainUnlocked,
}

impl UpstreamChange {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamChange::Background => "background",
            UpstreamChange::Characters => "characters",
            UpstreamChange::ChainUnlocked => "chain_unlocked",
        }
    }
}

impl std::fmt::Display for UpstreamChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one upstream change knocked stale, for logging and responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationReport {
    pub change: UpstreamChange,
    pub chains: Vec<String>,
    pub scenes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

/// Mark every scene detail strictly after `edited_order` as `NeedsRegen`.
///
/// Scenes at or before the edited order are untouched. Returns the
/// affected scene ids in sequence order.
pub fn invalidate_downstream_scenes(
    session: &mut SessionContext,
    edited_order: u32,
) -> Vec<String> {
    let mut affected = Vec::new();
    for detail in session.scene_details.values_mut() {
        if detail.sequence > edited_order && detail.status != ArtifactStatus::NeedsRegen {
            detail.status = ArtifactStatus::NeedsRegen;
            detail.touch();
            affected.push((detail.sequence, detail.scene_id.clone()));
        }
    }
    affected.sort();
    affected.into_iter().map(|(_, id)| id).collect()
}

/// Mark currently-`Locked` scene details strictly after `unlocked_order`
/// as `NeedsRegen`.
///
/// Narrower than [`invalidate_downstream_scenes`]: only later scenes whose
/// content was committed assuming this scene's finality are demoted.
pub fn invalidate_later_locked_scenes(
    session: &mut SessionContext,
    unlocked_order: u32,
) -> Vec<String> {
    let mut affected = Vec::new();
    for detail in session.scene_details.values_mut() {
        if detail.sequence > unlocked_order && detail.status.is_locked() {
            detail.status = ArtifactStatus::NeedsRegen;
            detail.touch();
            affected.push((detail.sequence, detail.scene_id.clone()));
        }
    }
    affected.sort();
    affected.into_iter().map(|(_, id)| id).collect()
}

/// Mark every macro chain in the session as `NeedsRegen`.
///
/// No per-chain version inspection: any chain snapshot, whatever ledger
/// state it used, is declared stale when a gate-keeping block changes.
pub fn invalidate_macro_chains(session: &mut SessionContext) -> Vec<String> {
    let mut affected = Vec::new();
    for (chain_id, chain) in session.macro_chains.iter_mut() {
        if chain.status != ArtifactStatus::NeedsRegen {
            chain.status = ArtifactStatus::NeedsRegen;
            chain.touch();
            affected.push(chain_id.clone());
        }
    }
    affected
}

/// Mark every scene detail in the session as `NeedsRegen`.
pub fn invalidate_all_scenes(session: &mut SessionContext) -> Vec<String> {
    invalidate_downstream_scenes(session, 0)
}

/// Run the full cascade for one upstream change: every chain and every
/// scene detail goes stale.
pub fn propagate_upstream_change(
    session: &mut SessionContext,
    change: UpstreamChange,
) -> PropagationReport {
    PropagationReport {
        change,
        chains: invalidate_macro_chains(session),
        scenes: invalidate_all_scenes(session),
    }
}

// ---------------------------------------------------------------------------
// Trivial-edit suppression
// ---------------------------------------------------------------------------

/// Whether two versions of a scene detail differ only in bookkeeping.
///
/// Compares the records with top-level `lastUpdatedAt` and `version`
/// stripped; true iff everything else is deep-equal. Used to suppress
/// invalidation cascades for edits that never touched semantic content.
pub fn is_trivial_edit(old: &SceneDetail, new: &SceneDetail) -> bool {
    let (Ok(mut before), Ok(mut after)) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        // An unserializable detail never counts as trivial.
        return false;
    };
    for value in [&mut before, &mut after] {
        if let serde_json::Value::Object(record) = value {
            record.remove("lastUpdatedAt");
            record.remove("version");
        }
    }
    before == after
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
