//! The characters block: the one block whose payload the core understands.
//!
//! Individual characters stay opaque JSON (their fields are generator
//! content), but the block-level envelope carries a lock flag and an
//! epoch-millisecond edit stamp the core maintains.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{epoch_millis, Timestamp};

/// Envelope around the generated character roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharactersBlock {
    /// The roster. Older records stored this under `characters`.
    #[serde(default, alias = "characters")]
    pub list: Vec<serde_json::Value>,
    /// Mirror of `locks[characters]`; the locks map is authoritative.
    #[serde(default)]
    pub locked: bool,
    #[serde(
        default,
        with = "crate::types::ts::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub locked_at: Option<Timestamp>,
    /// Epoch milliseconds of the last roster edit. A wall-clock UI stamp,
    /// not a ledger counter.
    #[serde(default)]
    pub version: i64,
}

impl CharactersBlock {
    /// Envelope for a freshly generated roster: unlocked, stamped now.
    pub fn generated(list: Vec<serde_json::Value>) -> Self {
        Self {
            list,
            locked: false,
            locked_at: None,
            version: epoch_millis(),
        }
    }

    /// Find a roster entry by its `id` field.
    pub fn find(&self, character_id: &str) -> Option<usize> {
        self.list
            .iter()
            .position(|c| c.get("id").and_then(|v| v.as_str()) == Some(character_id))
    }

    /// Replace the roster entry whose `id` matches the payload's `id`.
    ///
    /// Refreshes the edit stamp on success.
    pub fn upsert(&mut self, character: serde_json::Value) -> Result<(), CoreError> {
        let id = character
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CoreError::Validation("character payload must carry an id".into()))?;
        let idx = self
            .find(id)
            .ok_or_else(|| CoreError::not_found("character", id))?;
        self.list[idx] = character;
        self.version = epoch_millis();
        Ok(())
    }

    /// Remove a roster entry by id, returning it.
    pub fn remove(&mut self, character_id: &str) -> Result<serde_json::Value, CoreError> {
        let idx = self
            .find(character_id)
            .ok_or_else(|| CoreError::not_found("character", character_id))?;
        let removed = self.list.remove(idx);
        self.version = epoch_millis();
        Ok(removed)
    }
}
