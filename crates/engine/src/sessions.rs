//! Session lifecycle and context-block operations.
//!
//! Operations:
//! - [`Engine::get_or_create`] — load a session, persisting a fresh
//!   zero-state one on first touch
//! - [`Engine::get`] — load without creating
//! - [`Engine::append_block`] — merge a payload into one context block
//! - [`Engine::clear_blocks`] — drop every block, reset the mutation counter
//! - [`Engine::health`] — existence/version/lock summary for diagnostics

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use storyloom_core::merge::merge_block_data;
use storyloom_core::types::Timestamp;
use storyloom_core::{BlockType, CoreError, SessionContext};

use crate::{Engine, EngineError};

/// Summary of one session's stored state.
///
/// When `exists` is false the counts and flags are at their zero defaults
/// and the timestamps are absent; nothing was ever saved to summarize.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub session_id: String,
    pub exists: bool,
    pub version: u64,
    pub block_count: usize,
    pub chain_count: usize,
    pub scene_detail_count: usize,
    pub has_background: bool,
    pub has_characters: bool,
    pub locks: BTreeMap<String, bool>,
    #[serde(
        with = "storyloom_core::types::ts::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
    #[serde(
        with = "storyloom_core::types::ts::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,
}

impl Engine {
    /// Load a session, creating and persisting the zero-state aggregate if
    /// it was never saved.
    pub async fn get_or_create(&self, session_id: &str) -> Result<SessionContext, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let (session, created) = self.load_or_create(session_id).await?;
        if created {
            self.save(&session).await?;
            info!(session_id, "session context created");
        }
        Ok(session)
    }

    /// Load a session without creating one.
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionContext>, EngineError> {
        Ok(self.store().load(session_id).await?)
    }

    /// Merge a payload into one context block.
    ///
    /// Each block type has its own merge semantics (see
    /// [`merge_block_data`]); the call counts as one session mutation.
    /// Appends never move the ledger — only lock transitions do — and a
    /// locked block refuses appends until it is unlocked.
    pub async fn append_block(
        &self,
        session_id: &str,
        block_type: BlockType,
        data: serde_json::Value,
    ) -> Result<SessionContext, EngineError> {
        block_type.ensure_appendable()?;
        let _guard = self.session_locks().acquire(session_id).await;
        let (mut session, _) = self.load_or_create(session_id).await?;
        if session.block_locked(block_type) {
            return Err(CoreError::AlreadyLocked {
                entity: "context block",
                id: block_type.as_str().to_string(),
            }
            .into());
        }

        let merged = merge_block_data(session.block(block_type), data, block_type);
        session
            .blocks
            .insert(block_type.as_str().to_string(), merged);
        session.bump_version();
        self.save(&session).await?;
        info!(
            session_id,
            block_type = %block_type,
            version = session.version,
            "context block appended"
        );
        Ok(session)
    }

    /// Drop every context block and reset the mutation counter to 0.
    ///
    /// Locks, the ledger, chains and scene details survive a clear; see
    /// [`SessionContext::clear_blocks`].
    pub async fn clear_blocks(&self, session_id: &str) -> Result<SessionContext, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let (mut session, _) = self.load_or_create(session_id).await?;
        session.clear_blocks();
        self.save(&session).await?;
        info!(session_id, "session context cleared");
        Ok(session)
    }

    /// Summarize a session's stored state without mutating it.
    pub async fn health(&self, session_id: &str) -> Result<HealthReport, EngineError> {
        let report = match self.store().load(session_id).await? {
            None => HealthReport {
                session_id: session_id.to_string(),
                exists: false,
                version: 0,
                block_count: 0,
                chain_count: 0,
                scene_detail_count: 0,
                has_background: false,
                has_characters: false,
                locks: BTreeMap::new(),
                created_at: None,
                updated_at: None,
            },
            Some(session) => HealthReport {
                session_id: session.session_id.clone(),
                exists: true,
                version: session.version,
                block_count: session.blocks.len(),
                chain_count: session.macro_chains.len(),
                scene_detail_count: session.scene_details.len(),
                has_background: session.has_block(BlockType::Background),
                has_characters: session.has_block(BlockType::Characters),
                locks: session.locks.clone(),
                created_at: Some(session.created_at),
                updated_at: Some(session.updated_at),
            },
        };
        Ok(report)
    }
}
