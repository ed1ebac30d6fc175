//! Lock transitions and the invalidation they fan out.
//!
//! Operations:
//! - [`Engine::lock_block`] — context-block flag; a bumping transition
//!   of a gate-keeping block also demotes every downstream artifact
//! - [`Engine::lock_chain`] — strict chain transition, with the one-time
//!   legacy-store migration beforehand
//! - [`Engine::lock_scene`] — strict scene transition; locking folds the
//!   scene's `contextOut` into the shared blocks
//! - [`Engine::propagate_upstream_change`] — explicit full-cascade hook

use serde::Serialize;
use tracing::info;

use storyloom_core::invalidation::{self, UpstreamChange};
use storyloom_core::lock;
use storyloom_core::merge::accumulate_context_out;
use storyloom_core::{BlockType, CoreError, MacroChain, SceneDetail, SessionContext};

use crate::{Engine, EngineError};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of a context-block lock call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLockReport {
    pub block_type: BlockType,
    pub locked: bool,
    /// Whether a gate-keeping counter moved (and the cascade below ran).
    pub ledger_bumped: bool,
    pub invalidated_chains: Vec<String>,
    pub invalidated_scenes: Vec<String>,
    pub session: SessionContext,
}

/// Result of a chain lock call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLockReport {
    pub chain: MacroChain,
    /// Scene details demoted to `NeedsRegen` by an unlock.
    pub affected_scenes: Vec<String>,
    /// Whether the chain had to be copied out of the legacy store first.
    pub migrated_from_legacy: bool,
    pub session: SessionContext,
}

/// Result of a scene lock call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLockReport {
    pub scene: SceneDetail,
    /// Later locked scenes demoted to `NeedsRegen` by an unlock.
    pub affected_scenes: Vec<String>,
    pub session: SessionContext,
}

/// Everything one explicit propagation pass knocked stale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationOutcome {
    pub change: String,
    pub chains: Vec<String>,
    pub scenes: Vec<String>,
    pub session: SessionContext,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Set a context block's lock flag.
    ///
    /// Idempotent re-locks and re-unlocks are permitted. An actual
    /// unlocked→locked transition of `background` or `characters` bumps
    /// that block's ledger counter, and since every chain and scene
    /// witness was stamped against the old counter, the full downstream
    /// cascade runs in the same save.
    pub async fn lock_block(
        &self,
        session_id: &str,
        block_type: BlockType,
        locked: bool,
    ) -> Result<BlockLockReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let (mut session, _) = self.load_or_create(session_id).await?;
        let outcome = lock::lock_context_block(&mut session, block_type, locked)?;

        let mut invalidated_chains = Vec::new();
        let mut invalidated_scenes = Vec::new();
        if outcome.ledger_bumped {
            let change = if block_type == BlockType::Background {
                UpstreamChange::Background
            } else {
                UpstreamChange::Characters
            };
            let report = invalidation::propagate_upstream_change(&mut session, change);
            invalidated_chains = report.chains;
            invalidated_scenes = report.scenes;
            if !invalidated_chains.is_empty() || !invalidated_scenes.is_empty() {
                info!(
                    session_id,
                    change = %change,
                    chains = invalidated_chains.len(),
                    scenes = invalidated_scenes.len(),
                    "downstream artifacts invalidated by relock"
                );
            }
        }

        self.save(&session).await?;
        info!(
            session_id,
            block_type = %block_type,
            locked,
            version = session.version,
            background_v = session.meta.background_v,
            characters_v = session.meta.characters_v,
            "context block lock updated"
        );
        Ok(BlockLockReport {
            block_type,
            locked,
            ledger_bumped: outcome.ledger_bumped,
            invalidated_chains,
            invalidated_scenes,
            session,
        })
    }

    /// Lock or unlock a macro chain.
    ///
    /// Chains from the previous backend generation lived in a standalone
    /// store; a chain id the session does not know is looked up there and
    /// copied in before the transition runs, persisted only together with
    /// the transition's own save. Unlocking lands on `Edited` and demotes
    /// every scene detail in the session.
    pub async fn lock_chain(
        &self,
        session_id: &str,
        chain_id: &str,
        locked: bool,
    ) -> Result<ChainLockReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;

        let mut migrated_from_legacy = false;
        if session.chain(chain_id).is_none() {
            if let Some(legacy) = self.store().load_legacy_chain(chain_id).await? {
                info!(session_id, chain_id, "chain migrated from legacy store");
                session.macro_chains.insert(chain_id.to_string(), legacy);
                migrated_from_legacy = true;
            }
        }

        let outcome = lock::lock_macro_chain(&mut session, chain_id, locked)?;
        self.save(&session).await?;
        info!(
            session_id,
            chain_id,
            status = %outcome.status,
            affected_scenes = outcome.affected_scenes.len(),
            migrated_from_legacy,
            "macro chain lock updated"
        );
        let chain = session
            .chain(chain_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
        Ok(ChainLockReport {
            chain,
            affected_scenes: outcome.affected_scenes,
            migrated_from_legacy,
            session,
        })
    }

    /// Lock or unlock a scene detail.
    ///
    /// Locking folds the scene's `contextOut` into the session's shared
    /// `story_facts`, `world_state` and `world_seeds` blocks in the same
    /// save as the transition. Unlocking lands on `Edited` and demotes
    /// later, currently-locked scenes; what was already accumulated from
    /// this scene stays accumulated.
    pub async fn lock_scene(
        &self,
        session_id: &str,
        scene_id: &str,
        locked: bool,
    ) -> Result<SceneLockReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let outcome = lock::lock_scene(&mut session, scene_id, locked)?;

        let scene = session
            .scene_detail(scene_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("scene detail", scene_id))?;
        if locked {
            accumulate_context_out(&mut session, &scene.context_out);
        }

        self.save(&session).await?;
        info!(
            session_id,
            scene_id,
            status = %outcome.status,
            affected_scenes = outcome.affected_scenes.len(),
            "scene detail lock updated"
        );
        Ok(SceneLockReport {
            scene,
            affected_scenes: outcome.affected_scenes,
            session,
        })
    }

    /// Explicitly run the full upstream-change cascade.
    ///
    /// [`Engine::lock_block`] runs this automatically on a bumping
    /// transition; the explicit hook exists for collaborators that change
    /// upstream content through their own paths and need to declare it.
    /// Safe to repeat: already-stale artifacts are not re-reported.
    pub async fn propagate_upstream_change(
        &self,
        session_id: &str,
        change: UpstreamChange,
    ) -> Result<PropagationOutcome, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let report = invalidation::propagate_upstream_change(&mut session, change);
        session.bump_version();
        self.save(&session).await?;
        info!(
            session_id,
            change = %report.change,
            chains = report.chains.len(),
            scenes = report.scenes.len(),
            "upstream change propagated"
        );
        Ok(PropagationOutcome {
            change: report.change.as_str().to_string(),
            chains: report.chains,
            scenes: report.scenes,
            session,
        })
    }
}
