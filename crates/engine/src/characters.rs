//! Character roster operations.
//!
//! The roster entries themselves are generator content and stay opaque;
//! these operations own the gates around them (a locked background, an
//! unlocked roster) and the bookkeeping: id minting, the edit stamp, and
//! the recorded envelope.

use serde::Serialize;
use tracing::info;

use storyloom_core::characters::CharactersBlock;
use storyloom_core::gating::ensure_characters_generation_allowed;
use storyloom_core::policy::clamp_player_count;
use storyloom_core::types::mint_id;
use storyloom_core::{BlockType, CoreError, SessionContext};

use crate::{Engine, EngineError};

/// Pre-flight answer for the character generation collaborator: the gate
/// passed, and this is the table size and ledger state to generate for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPlan {
    /// Requested size clamped into the supported range, falling back to
    /// the background block's `numberOfPlayers`, then the default.
    pub player_count: u8,
    pub background_v: u64,
    pub characters_v: u64,
}

/// A roster mutation's result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterReport {
    pub roster: CharactersBlock,
    pub session: SessionContext,
}

/// Roster re-records and entry edits are refused while the block is locked.
fn ensure_roster_unlocked(session: &SessionContext) -> Result<(), CoreError> {
    if session.block_locked(BlockType::Characters) {
        return Err(CoreError::AlreadyLocked {
            entity: "context block",
            id: BlockType::Characters.as_str().to_string(),
        });
    }
    Ok(())
}

impl Engine {
    /// Check the character-generation gate and resolve the table size.
    ///
    /// The lock layer never gates on content; this is where "background
    /// must be locked before characters are generated" is enforced. Reads
    /// only — the collaborator calls [`Engine::record_characters`] with
    /// what it produced.
    pub async fn plan_characters(
        &self,
        session_id: &str,
        requested_players: Option<i64>,
    ) -> Result<CharacterPlan, EngineError> {
        let session = self.load_required(session_id).await?;
        ensure_characters_generation_allowed(&session)?;

        let fallback = session
            .block(BlockType::Background)
            .and_then(|background| background.get("numberOfPlayers"))
            .and_then(|count| count.as_i64());
        Ok(CharacterPlan {
            player_count: clamp_player_count(requested_players.or(fallback)),
            background_v: session.meta.background_v,
            characters_v: session.meta.characters_v,
        })
    }

    /// Install a freshly generated roster.
    ///
    /// Same gate as planning, plus the roster must not be locked. Entries
    /// arriving without an `id` get one minted so later upserts and
    /// deletes can address them.
    pub async fn record_characters(
        &self,
        session_id: &str,
        list: Vec<serde_json::Value>,
    ) -> Result<RosterReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        ensure_characters_generation_allowed(&session)?;
        ensure_roster_unlocked(&session)?;

        let list = list
            .into_iter()
            .map(|mut character| {
                if let serde_json::Value::Object(fields) = &mut character {
                    if !fields.contains_key("id") {
                        fields.insert(
                            "id".to_string(),
                            serde_json::Value::String(mint_id("char")),
                        );
                    }
                }
                character
            })
            .collect();
        let roster = CharactersBlock::generated(list);
        session.set_characters_block(&roster)?;
        session.bump_version();
        self.save(&session).await?;
        info!(
            session_id,
            character_count = roster.list.len(),
            version = session.version,
            "character roster recorded"
        );
        Ok(RosterReport { roster, session })
    }

    /// Replace one roster entry, matched by the payload's `id`.
    pub async fn upsert_character(
        &self,
        session_id: &str,
        character: serde_json::Value,
    ) -> Result<RosterReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let mut roster = session
            .characters_block()?
            .ok_or_else(|| CoreError::not_found("characters block", session_id))?;
        ensure_roster_unlocked(&session)?;

        roster.upsert(character)?;
        session.set_characters_block(&roster)?;
        session.bump_version();
        self.save(&session).await?;
        info!(session_id, version = session.version, "character updated");
        Ok(RosterReport { roster, session })
    }

    /// Remove one roster entry by id.
    pub async fn delete_character(
        &self,
        session_id: &str,
        character_id: &str,
    ) -> Result<RosterReport, EngineError> {
        let _guard = self.session_locks().acquire(session_id).await;
        let mut session = self.load_required(session_id).await?;
        let mut roster = session
            .characters_block()?
            .ok_or_else(|| CoreError::not_found("characters block", session_id))?;
        ensure_roster_unlocked(&session)?;

        roster.remove(character_id)?;
        session.set_characters_block(&roster)?;
        session.bump_version();
        self.save(&session).await?;
        info!(
            session_id,
            character_id,
            remaining = roster.list.len(),
            "character removed"
        );
        Ok(RosterReport { roster, session })
    }
}
