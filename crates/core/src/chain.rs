//! Macro chain: the ordered scene skeleton of a campaign.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::staleness::UsesWitness;
use crate::status::ArtifactStatus;
use crate::types::{now, Timestamp};

/// One slot in a macro chain: the outline of a scene, before any detail
/// is generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroScene {
    pub id: String,
    /// 1-based position in the chain; contiguous and unique within a chain.
    pub order: u32,
    pub title: String,
    pub objective: String,
}

/// An ordered chain of macro scenes plus its lifecycle bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroChain {
    pub chain_id: String,
    pub scenes: Vec<MacroScene>,
    pub status: ArtifactStatus,
    /// Increments on any edit or lock transition of the chain itself.
    pub version: u64,
    #[serde(
        default,
        with = "crate::types::ts::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub locked_at: Option<Timestamp>,
    #[serde(default = "now", with = "crate::types::ts")]
    pub last_updated_at: Timestamp,
    /// Free-form generation metadata (concept, style hints). Opaque here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    /// Ledger state this chain was generated against.
    #[serde(default)]
    pub uses: UsesWitness,
}

impl MacroChain {
    /// Build a freshly generated chain. Validates scene ordering.
    pub fn generated(
        chain_id: impl Into<String>,
        scenes: Vec<MacroScene>,
        meta: Option<serde_json::Value>,
        uses: UsesWitness,
    ) -> Result<Self, CoreError> {
        validate_scene_order(&scenes)?;
        Ok(Self {
            chain_id: chain_id.into(),
            scenes,
            status: ArtifactStatus::Generated,
            version: 1,
            locked_at: None,
            last_updated_at: now(),
            meta,
            uses,
        })
    }

    pub fn scene(&self, scene_id: &str) -> Option<&MacroScene> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &str) -> Option<&mut MacroScene> {
        self.scenes.iter_mut().find(|s| s.id == scene_id)
    }

    /// Refresh the last-updated stamp.
    pub fn touch(&mut self) {
        self.last_updated_at = now();
    }

    /// Remove a scene slot and close the resulting gap in `order`.
    ///
    /// Returns the removed slot, or `None` if the id is not in this chain.
    pub fn remove_scene(&mut self, scene_id: &str) -> Option<MacroScene> {
        let idx = self.scenes.iter().position(|s| s.id == scene_id)?;
        let removed = self.scenes.remove(idx);
        resequence(&mut self.scenes);
        Some(removed)
    }
}

/// Validate that scene orders are 1-based, contiguous, and unique, and that
/// scene ids are unique.
pub fn validate_scene_order(scenes: &[MacroScene]) -> Result<(), CoreError> {
    let mut orders: Vec<u32> = scenes.iter().map(|s| s.order).collect();
    orders.sort_unstable();
    for (idx, order) in orders.iter().enumerate() {
        let expected = idx as u32 + 1;
        if *order != expected {
            return Err(CoreError::Validation(format!(
                "Scene orders must be 1-based and contiguous; expected {expected}, found {order}"
            )));
        }
    }

    let mut ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
    ids.sort_unstable();
    if let Some(dup) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(CoreError::Validation(format!(
            "Duplicate scene id '{}' in chain",
            dup[0]
        )));
    }
    Ok(())
}

/// Sort scenes by their current order and rewrite orders to 1..=len.
pub fn resequence(scenes: &mut [MacroScene]) {
    scenes.sort_by_key(|s| s.order);
    for (idx, scene) in scenes.iter_mut().enumerate() {
        scene.order = idx as u32 + 1;
    }
}
