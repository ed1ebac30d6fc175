//! The per-session aggregate: context blocks, lock flags, the version
//! ledger, macro chains and scene details.
//!
//! Everything a session owns lives in one record so that a mutation and the
//! invalidation it triggers are saved together. Reads that used to be served
//! by a mirrored copy of the chain inside `blocks.custom` are answered by
//! [`SessionContext::chain_projection`] instead, so the chain map stays the
//! single source of truth.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::BlockType;
use crate::chain::{MacroChain, MacroScene};
use crate::characters::CharactersBlock;
use crate::error::CoreError;
use crate::ledger::VersionLedger;
use crate::scene::SceneDetail;
use crate::types::{now, Timestamp};

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// One authoring session's whole working state.
///
/// `blocks` is an open map: the well-known block names are in [`BlockType`],
/// but records may carry additional keys and they are preserved verbatim.
/// `version` counts mutations for optimistic concurrency on the client; the
/// staleness machinery never reads it, it reads `meta` (the ledger).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub blocks: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub locks: BTreeMap<String, bool>,
    #[serde(default)]
    pub meta: VersionLedger,
    #[serde(default)]
    pub macro_chains: BTreeMap<String, MacroChain>,
    #[serde(default)]
    pub scene_details: BTreeMap<String, SceneDetail>,
    #[serde(default)]
    pub version: u64,
    #[serde(default = "now", with = "crate::types::ts")]
    pub created_at: Timestamp,
    #[serde(default = "now", with = "crate::types::ts")]
    pub updated_at: Timestamp,
}

impl SessionContext {
    /// Fresh session at its zero state: no blocks, no locks, ledger at 0/0.
    pub fn new(session_id: impl Into<String>) -> Self {
        let created = now();
        Self {
            session_id: session_id.into(),
            blocks: BTreeMap::new(),
            locks: BTreeMap::new(),
            meta: VersionLedger::new(),
            macro_chains: BTreeMap::new(),
            scene_details: BTreeMap::new(),
            version: 0,
            created_at: created,
            updated_at: created,
        }
    }

    /// Rebuild a session from a stored record, filling in whatever the
    /// record is missing.
    ///
    /// A record is refused as corrupt only when `blocks` and `macroChains`
    /// are both absent; any other missing field gets its default. Extra
    /// keys (including the derived `macroSnapshotV` older records persisted
    /// inside `meta`) are ignored.
    pub fn from_value(session_id: &str, value: serde_json::Value) -> Result<Self, CoreError> {
        let corrupt = |reason: String| CoreError::CorruptRecord {
            session_id: session_id.to_string(),
            reason,
        };
        let record = value
            .as_object()
            .ok_or_else(|| corrupt("record is not a JSON object".to_string()))?;
        if !record.contains_key("blocks") && !record.contains_key("macroChains") {
            return Err(corrupt(
                "blocks and macroChains are both missing".to_string(),
            ));
        }
        let mut session: SessionContext =
            serde_json::from_value(value).map_err(|err| corrupt(err.to_string()))?;
        if session.session_id.is_empty() {
            session.session_id = session_id.to_string();
        }
        Ok(session)
    }

    /// Refresh `updatedAt` without counting a mutation.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Count one mutation: bump the session version and refresh `updatedAt`.
    pub fn bump_version(&mut self) {
        self.version += 1;
        self.touch();
    }

    /// Drop every context block and reset the mutation counter.
    ///
    /// Locks, the ledger, chains and scene details survive a clear.
    pub fn clear_blocks(&mut self) {
        self.blocks.clear();
        self.version = 0;
        self.touch();
    }

    // -----------------------------------------------------------------------
    // Block access
    // -----------------------------------------------------------------------

    pub fn block(&self, kind: BlockType) -> Option<&serde_json::Value> {
        self.blocks.get(kind.as_str())
    }

    /// Whether a block is present with actual content. Empty objects,
    /// arrays and strings do not count.
    pub fn has_block(&self, kind: BlockType) -> bool {
        match self.blocks.get(kind.as_str()) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Object(map)) => !map.is_empty(),
            Some(serde_json::Value::Array(items)) => !items.is_empty(),
            Some(serde_json::Value::String(text)) => !text.is_empty(),
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::Number(_)) => true,
        }
    }

    pub fn block_locked(&self, kind: BlockType) -> bool {
        self.locks.get(kind.as_str()).copied().unwrap_or(false)
    }

    /// Typed view of the characters block, if one has been recorded.
    pub fn characters_block(&self) -> Result<Option<CharactersBlock>, CoreError> {
        match self.blocks.get(BlockType::Characters.as_str()) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|err| {
                CoreError::CorruptRecord {
                    session_id: self.session_id.clone(),
                    reason: format!("characters block: {err}"),
                }
            }),
        }
    }

    pub fn set_characters_block(&mut self, roster: &CharactersBlock) -> Result<(), CoreError> {
        let value = serde_json::to_value(roster).map_err(|err| CoreError::CorruptRecord {
            session_id: self.session_id.clone(),
            reason: format!("characters block: {err}"),
        })?;
        self.blocks
            .insert(BlockType::Characters.as_str().to_string(), value);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chains and scenes
    // -----------------------------------------------------------------------

    pub fn chain(&self, chain_id: &str) -> Option<&MacroChain> {
        self.macro_chains.get(chain_id)
    }

    pub fn chain_mut(&mut self, chain_id: &str) -> Option<&mut MacroChain> {
        self.macro_chains.get_mut(chain_id)
    }

    pub fn chain_locked(&self, chain_id: &str) -> bool {
        self.chain(chain_id)
            .map(|chain| chain.status.is_locked())
            .unwrap_or(false)
    }

    pub fn scene_detail(&self, scene_id: &str) -> Option<&SceneDetail> {
        self.scene_details.get(scene_id)
    }

    pub fn scene_detail_mut(&mut self, scene_id: &str) -> Option<&mut SceneDetail> {
        self.scene_details.get_mut(scene_id)
    }

    pub fn scene_locked(&self, scene_id: &str) -> bool {
        self.scene_detail(scene_id)
            .map(|detail| detail.status.is_locked())
            .unwrap_or(false)
    }

    /// Find the chain slot a scene id belongs to.
    pub fn scene_slot(&self, scene_id: &str) -> Option<(&str, &MacroScene)> {
        self.macro_chains.iter().find_map(|(chain_id, chain)| {
            chain.scene(scene_id).map(|slot| (chain_id.as_str(), slot))
        })
    }

    /// Read-side projection of a chain: the chain record plus a per-scene
    /// summary of whatever details exist for its slots.
    pub fn chain_projection(&self, chain_id: &str) -> Result<serde_json::Value, CoreError> {
        let chain = self
            .chain(chain_id)
            .ok_or_else(|| CoreError::not_found("macro chain", chain_id))?;
        let mut projection =
            serde_json::to_value(chain).map_err(|err| CoreError::CorruptRecord {
                session_id: self.session_id.clone(),
                reason: format!("macro chain {chain_id}: {err}"),
            })?;
        let mut details = serde_json::Map::new();
        for slot in &chain.scenes {
            if let Some(detail) = self.scene_details.get(&slot.id) {
                details.insert(
                    slot.id.clone(),
                    serde_json::json!({
                        "status": detail.status,
                        "version": detail.version,
                        "sequence": detail.sequence,
                    }),
                );
            }
        }
        if let serde_json::Value::Object(map) = &mut projection {
            map.insert(
                "sceneDetails".to_string(),
                serde_json::Value::Object(details),
            );
        }
        Ok(projection)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
