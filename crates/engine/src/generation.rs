//! Recording gates for generated chain and scene content.
//!
//! The generation collaborator produces the content; these operations
//! decide whether generation may proceed (locks, sequencing, freshness)
//! and stamp what gets stored: status, version, and the uses witness that
//! later staleness checks compare against the ledger.

use serde::Serialize;
use tracing::info;

use storyloom_core::chain::validate_scene_order;
use storyloom_core::gating::{ensure_chain_generation_allowed, ensure_scene_generation_allowed};
use storyloom_core::invalidation::invalidate_all_scenes;
use storyloom_core::scene::ContextOut;
use storyloom_core::staleness::{self, validate_scene_version};
use storyloom_core::types::mint_id;
use storyloom_core::{
    ArtifactStatus, CoreError, MacroChain, MacroScene, SceneDetail, SceneVersionCheck,
    SessionContext, UsesVersions, UsesWitness,
};

use crate::{Engine, EngineError};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A freshly recorded (or regenerated) chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedChain {
    pub chain: MacroChain,
    /// Scene details demoted because an in-place regeneration replaced
    /// the chain shape they were built against.
    pub invalidated_scenes: Vec<String>,
    pub session: SessionContext,
}

/// A freshly recorded (or regenerated) scene detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedScene {
    pub scene: SceneDetail,
    pub session: SessionContext,
}

/// Pre-flight freshness report for one scene's recorded witness.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFreshness {
    pub scene_id: String,
    #[serde(flatten)]
    pub check: SceneVersionCheck,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Record a generated macro chain.
    ///
    /// Requires background and characters locked; the stored chain is
    /// stamped with the ledger state it was generated against. With
    /// `chain_id` set, an existing non-locked chain is regenerated in
    /// place and every scene detail in the session is demoted — the shape
    /// they were built against is gone. Without it a fresh chain id is
    /// minted and existing details are left alone.
    pub async fn record_chain(
        &self,
        session_id: &str,
        chain_id: Option<&str>,
        scenes: Vec<MacroScene>,
        meta: Option<serde_json::Value>,
    ) -> Result<RecordedChain, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        ensure_chain_generation_allowed(&session)?;
        let witness = UsesWitness::Recorded(UsesVersions::stamp(&session.meta));

        let mut invalidated_scenes = Vec::new();
        let chain_id = match chain_id {
            None => {
                let chain_id = mint_id("chain");
                let chain = MacroChain::generated(chain_id.clone(), scenes, meta, witness)?;
                session.macro_chains.insert(chain_id.clone(), chain);
                chain_id
            }
            Some(existing_id) => {
                validate_scene_order(&scenes)?;
                let chain = session
                    .chain_mut(existing_id)
                    .ok_or_else(|| CoreError::not_found("macro chain", existing_id))?;
                if chain.status.is_locked() {
                    return Err(CoreError::AlreadyLocked {
                        entity: "macro chain",
                        id: existing_id.to_string(),
                    }
                    .into());
                }
                chain.scenes = scenes;
                chain.meta = meta;
                chain.status = ArtifactStatus::Generated;
                chain.version += 1;
                chain.locked_at = None;
                chain.uses = witness;
                chain.touch();
                invalidated_scenes = invalidate_all_scenes(&mut session);
                existing_id.to_string()
            }
        };

        session.bump_version();
        self.save(&session).await?;
        let chain = session
            .chain(&chain_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("macro chain", chain_id.as_str()))?;
        info!(
            session_id,
            chain_id = %chain.chain_id,
            scene_count = chain.scenes.len(),
            snapshot_v = session.meta.snapshot_version(),
            "macro chain recorded"
        );
        Ok(RecordedChain {
            chain,
            invalidated_scenes,
            session,
        })
    }

    /// Record a generated detail for one chain slot.
    ///
    /// Gates: the owning chain must be locked and fresh against the
    /// current ledger, and past the opening scene the previous slot's
    /// detail must be locked. The stored record is stamped with the
    /// ledger plus the predecessor detail's version, so a later check can
    /// name exactly what moved. Re-recording a non-locked detail replaces
    /// its content and continues its version line.
    pub async fn record_scene_detail(
        &self,
        session_id: &str,
        scene_id: &str,
        narrative: serde_json::Map<String, serde_json::Value>,
        context_out: ContextOut,
    ) -> Result<RecordedScene, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let placement = ensure_scene_generation_allowed(&session, scene_id)?;

        let chain = session
            .chain(&placement.chain_id)
            .ok_or_else(|| CoreError::not_found("macro chain", placement.chain_id.as_str()))?;
        staleness::ensure_fresh(
            &chain.uses,
            &session.meta,
            &format!("macro chain {}", placement.chain_id),
        )?;
        let previous_version = match session.scene_detail(scene_id) {
            Some(existing) if existing.status.is_locked() => {
                return Err(CoreError::AlreadyLocked {
                    entity: "scene detail",
                    id: scene_id.to_string(),
                }
                .into());
            }
            Some(existing) => Some(existing.version),
            None => None,
        };

        let mut uses = UsesVersions::stamp(&session.meta);
        if let Some((prev_id, prev_version)) = &placement.prev_scene {
            uses = uses.with_prev_scene(prev_id.clone(), *prev_version);
        }
        let slot = MacroScene {
            id: scene_id.to_string(),
            order: placement.order,
            title: placement.title.clone(),
            objective: placement.objective.clone(),
        };
        let mut detail = SceneDetail::generated(
            &slot,
            narrative,
            context_out,
            UsesWitness::Recorded(uses),
        );
        if let Some(version) = previous_version {
            detail.version = version + 1;
        }
        session.scene_details.insert(scene_id.to_string(), detail);
        session.bump_version();
        self.save(&session).await?;

        let scene = session
            .scene_detail(scene_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("scene detail", scene_id))?;
        info!(
            session_id,
            scene_id,
            order = scene.sequence,
            version = scene.version,
            "scene detail recorded"
        );
        Ok(RecordedScene { scene, session })
    }

    /// Compare a scene's recorded witness against the current ledger.
    ///
    /// A slot with no recorded detail reports as never validated (always
    /// stale, no recorded versions). The report converts to the
    /// enumerated staleness error via [`SceneVersionCheck::to_error`].
    pub async fn check_scene_freshness(
        &self,
        session_id: &str,
        scene_id: &str,
    ) -> Result<SceneFreshness, EngineError> {
        let session = self.load_required(session_id).await?;
        if session.scene_slot(scene_id).is_none() && session.scene_detail(scene_id).is_none() {
            return Err(CoreError::not_found("macro scene", scene_id).into());
        }
        let never = UsesWitness::NeverRecorded;
        let witness = session
            .scene_detail(scene_id)
            .map(|detail| &detail.uses)
            .unwrap_or(&never);
        Ok(SceneFreshness {
            scene_id: scene_id.to_string(),
            check: validate_scene_version(witness, &session.meta),
        })
    }
}
