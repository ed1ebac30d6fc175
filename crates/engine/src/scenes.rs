//! Manual editing of recorded content.
//!
//! Operations:
//! - [`Engine::apply_scene_edit`] — edit one detail, with trivial-edit
//!   suppression and forward invalidation
//! - [`Engine::apply_chain_edits`] — retitle/re-aim chain slots
//! - [`Engine::delete_scene`] — drop a slot and its detail, resequence

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use storyloom_core::invalidation::{invalidate_downstream_scenes, is_trivial_edit};
use storyloom_core::scene::ContextOut;
use storyloom_core::{ArtifactStatus, CoreError, MacroChain, SceneDetail, SessionContext};

use crate::{Engine, EngineError};

// ---------------------------------------------------------------------------
// Edit inputs
// ---------------------------------------------------------------------------

/// One manual edit to a scene detail. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneEdit {
    pub title: Option<String>,
    pub objective: Option<String>,
    /// Full replacement for the narrative payload.
    pub narrative: Option<serde_json::Map<String, serde_json::Value>>,
    /// Full replacement for the scene's downstream contributions.
    pub context_out: Option<ContextOut>,
}

impl SceneEdit {
    fn apply_to(&self, detail: &mut SceneDetail) {
        if let Some(title) = &self.title {
            detail.title = title.clone();
        }
        if let Some(objective) = &self.objective {
            detail.objective = objective.clone();
        }
        if let Some(narrative) = &self.narrative {
            detail.narrative = narrative.clone();
        }
        if let Some(context_out) = &self.context_out {
            detail.context_out = context_out.clone();
        }
    }
}

/// One title/objective edit to a chain slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSlotEdit {
    pub scene_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of a scene-detail edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEditReport {
    pub scene: SceneDetail,
    /// True when the edit changed nothing beyond bookkeeping and was
    /// dropped without a version bump or a cascade.
    pub trivial: bool,
    pub invalidated_scenes: Vec<String>,
    pub session: SessionContext,
}

/// Result of a batch of chain-slot edits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEditReport {
    pub chain: MacroChain,
    /// Slots whose title or objective actually changed.
    pub edited_scenes: Vec<String>,
    pub invalidated_scenes: Vec<String>,
    pub session: SessionContext,
}

/// Result of a scene deletion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDeleteReport {
    pub scene_id: String,
    /// 1-based order the scene held before deletion.
    pub order: u32,
    /// The owning chain after slot removal and resequencing, when the
    /// scene still had a slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<MacroChain>,
    pub invalidated_scenes: Vec<String>,
    pub session: SessionContext,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Apply a manual edit to one scene detail.
    ///
    /// Locked scenes must be unlocked first. Edits that change nothing
    /// beyond bookkeeping are suppressed entirely: no status or version
    /// change, no cascade, nothing saved. A substantive edit lands on
    /// `Edited` (a `NeedsRegen` detail keeps its stale marker), bumps the
    /// detail's version, and demotes every strictly later detail.
    pub async fn apply_scene_edit(
        &self,
        session_id: &str,
        scene_id: &str,
        edit: SceneEdit,
    ) -> Result<SceneEditReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let current = session
            .scene_detail(scene_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("scene detail", scene_id))?;
        if current.status.is_locked() {
            return Err(CoreError::AlreadyLocked {
                entity: "scene detail",
                id: scene_id.to_string(),
            }
            .into());
        }

        let mut candidate = current.clone();
        edit.apply_to(&mut candidate);
        if is_trivial_edit(&current, &candidate) {
            debug!(session_id, scene_id, "trivial edit suppressed");
            return Ok(SceneEditReport {
                scene: current,
                trivial: true,
                invalidated_scenes: Vec::new(),
                session,
            });
        }

        if candidate.status.can_transition_to(ArtifactStatus::Edited) {
            candidate.status = ArtifactStatus::Edited;
        }
        candidate.version += 1;
        candidate.touch();
        let sequence = candidate.sequence;
        session.scene_details.insert(scene_id.to_string(), candidate);
        let invalidated_scenes = invalidate_downstream_scenes(&mut session, sequence);
        session.bump_version();
        self.save(&session).await?;

        let scene = session
            .scene_detail(scene_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("scene detail", scene_id))?;
        info!(
            session_id,
            scene_id,
            version = scene.version,
            invalidated = invalidated_scenes.len(),
            "scene edit applied"
        );
        Ok(SceneEditReport {
            scene,
            trivial: false,
            invalidated_scenes,
            session,
        })
    }

    /// Apply title/objective edits to a chain's slots.
    ///
    /// The chain must not be locked and every referenced slot must exist.
    /// Edits that change no field are suppressed. Otherwise the chain
    /// lands on `Edited`, its version bumps once, and every detail at or
    /// after the lowest edited order is demoted — including the edited
    /// scene's own detail, which was generated for the old slot.
    pub async fn apply_chain_edits(
        &self,
        session_id: &str,
        chain_id: &str,
        edits: Vec<SceneSlotEdit>,
    ) -> Result<ChainEditReport, EngineError> {
        if edits.is_empty() {
            return Err(
                CoreError::Validation("at least one scene edit is required".to_string()).into(),
            );
        }
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        {
            let chain = session
                .chain(chain_id)
                .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
            if chain.status.is_locked() {
                return Err(CoreError::AlreadyLocked {
                    entity: "macro chain",
                    id: chain_id.to_string(),
                }
                .into());
            }
            for edit in &edits {
                if chain.scene(&edit.scene_id).is_none() {
                    return Err(
                        CoreError::not_found("macro scene", edit.scene_id.as_str()).into()
                    );
                }
            }
        }

        let mut edited_scenes = Vec::new();
        let mut lowest_order: Option<u32> = None;
        {
            let chain = session
                .chain_mut(chain_id)
                .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
            for edit in &edits {
                let Some(slot) = chain.scene_mut(&edit.scene_id) else {
                    continue;
                };
                let mut changed = false;
                if let Some(title) = &edit.title {
                    if slot.title != *title {
                        slot.title = title.clone();
                        changed = true;
                    }
                }
                if let Some(objective) = &edit.objective {
                    if slot.objective != *objective {
                        slot.objective = objective.clone();
                        changed = true;
                    }
                }
                if changed {
                    lowest_order = Some(lowest_order.map_or(slot.order, |low| low.min(slot.order)));
                    edited_scenes.push(edit.scene_id.clone());
                }
            }
            if lowest_order.is_some() {
                if chain.status.can_transition_to(ArtifactStatus::Edited) {
                    chain.status = ArtifactStatus::Edited;
                }
                chain.version += 1;
                chain.touch();
            }
        }

        let Some(lowest) = lowest_order else {
            debug!(session_id, chain_id, "chain edits changed nothing; suppressed");
            let chain = session
                .chain(chain_id)
                .cloned()
                .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
            return Ok(ChainEditReport {
                chain,
                edited_scenes,
                invalidated_scenes: Vec::new(),
                session,
            });
        };

        let invalidated_scenes =
            invalidate_downstream_scenes(&mut session, lowest.saturating_sub(1));
        session.bump_version();
        self.save(&session).await?;

        let chain = session
            .chain(chain_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
        info!(
            session_id,
            chain_id,
            edited = edited_scenes.len(),
            invalidated = invalidated_scenes.len(),
            version = chain.version,
            "chain edits applied"
        );
        Ok(ChainEditReport {
            chain,
            edited_scenes,
            invalidated_scenes,
            session,
        })
    }

    /// Delete a scene: its chain slot and any recorded detail.
    ///
    /// Refused while the owning chain is locked. Later slots close the
    /// gap in `order`, the surviving details' `sequence` mirrors follow,
    /// and every detail after the deleted order is demoted. A detail
    /// whose slot is already gone can still be deleted on its own.
    pub async fn delete_scene(
        &self,
        session_id: &str,
        scene_id: &str,
    ) -> Result<SceneDeleteReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;

        let placement = session
            .scene_slot(scene_id)
            .map(|(chain_id, slot)| (chain_id.to_string(), slot.order));
        let detail_order = session.scene_detail(scene_id).map(|detail| detail.sequence);
        let Some(order) = placement.as_ref().map(|(_, order)| *order).or(detail_order) else {
            return Err(CoreError::not_found("macro scene", scene_id).into());
        };

        let mut chain_snapshot = None;
        if let Some((chain_id, _)) = &placement {
            let slots: Vec<(String, u32)> = {
                let chain = session
                    .chain_mut(chain_id)
                    .ok_or_else(|| CoreError::not_found("macro chain", chain_id.as_str()))?;
                if chain.status.is_locked() {
                    return Err(CoreError::AlreadyLocked {
                        entity: "macro chain",
                        id: chain_id.clone(),
                    }
                    .into());
                }
                chain.remove_scene(scene_id);
                if chain.status.can_transition_to(ArtifactStatus::Edited) {
                    chain.status = ArtifactStatus::Edited;
                }
                chain.version += 1;
                chain.touch();
                chain
                    .scenes
                    .iter()
                    .map(|slot| (slot.id.clone(), slot.order))
                    .collect()
            };
            // Mirror the resequenced orders into the surviving details.
            for (slot_id, slot_order) in slots {
                if let Some(detail) = session.scene_detail_mut(&slot_id) {
                    detail.sequence = slot_order;
                }
            }
            chain_snapshot = session.chain(chain_id).cloned();
        }
        session.scene_details.remove(scene_id);

        let invalidated_scenes =
            invalidate_downstream_scenes(&mut session, order.saturating_sub(1));
        session.bump_version();
        self.save(&session).await?;
        info!(
            session_id,
            scene_id,
            order,
            invalidated = invalidated_scenes.len(),
            "scene deleted"
        );
        Ok(SceneDeleteReport {
            scene_id: scene_id.to_string(),
            order,
            chain: chain_snapshot,
            invalidated_scenes,
            session,
        })
    }
}
