//! Scene detail: the generated content for one macro-chain slot.

use serde::{Deserialize, Serialize};

use crate::chain::MacroScene;
use crate::staleness::UsesWitness;
use crate::status::ArtifactStatus;
use crate::types::{now, Timestamp};

/// The three accumulating world-seed lists.
///
/// Used both as a block payload shape and inside [`ContextOut`]; merging is
/// always per-list concatenation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSeeds {
    pub factions: Vec<String>,
    pub locations: Vec<String>,
    pub constraints: Vec<String>,
}

impl WorldSeeds {
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty() && self.locations.is_empty() && self.constraints.is_empty()
    }
}

/// Facts a scene contributes downstream once it is locked.
///
/// On scene lock these flow into the session's `story_facts`, `world_state`
/// and `world_seeds` blocks (append/union, never wholesale overwrite).
/// `character_moments` stays on the scene itself for readers; it has no
/// accumulating block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextOut {
    pub story_facts: Vec<serde_json::Value>,
    pub world_state: serde_json::Map<String, serde_json::Value>,
    pub world_seeds: WorldSeeds,
    pub character_moments: Vec<serde_json::Value>,
}

impl ContextOut {
    pub fn is_empty(&self) -> bool {
        self.story_facts.is_empty()
            && self.world_state.is_empty()
            && self.world_seeds.is_empty()
            && self.character_moments.is_empty()
    }
}

/// Generated detail for one scene slot.
///
/// The narrative payload (opening, beats, NPCs, environment, rewards and so
/// on) is opaque to the core: it is captured as flattened extra fields so
/// the stored shape stays exactly what the generator produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDetail {
    pub scene_id: String,
    /// Mirrors the owning macro scene's `order`; kept in sync on
    /// resequencing and used for all ordering comparisons.
    pub sequence: u32,
    pub title: String,
    pub objective: String,
    pub context_out: ContextOut,
    pub status: ArtifactStatus,
    /// Increments on any edit or lock transition of this detail.
    pub version: u64,
    #[serde(
        default,
        with = "crate::types::ts::opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub locked_at: Option<Timestamp>,
    #[serde(default = "now", with = "crate::types::ts")]
    pub last_updated_at: Timestamp,
    /// Ledger state this detail was generated against, including the
    /// versions of the previous scene details it consumed.
    #[serde(default)]
    pub uses: UsesWitness,
    /// Narrative payload fields, stored at the top level of the record.
    #[serde(flatten)]
    pub narrative: serde_json::Map<String, serde_json::Value>,
}

impl SceneDetail {
    /// Build a freshly generated detail for a chain slot.
    pub fn generated(
        slot: &MacroScene,
        narrative: serde_json::Map<String, serde_json::Value>,
        context_out: ContextOut,
        uses: UsesWitness,
    ) -> Self {
        Self {
            scene_id: slot.id.clone(),
            sequence: slot.order,
            title: slot.title.clone(),
            objective: slot.objective.clone(),
            context_out,
            status: ArtifactStatus::Generated,
            version: 1,
            locked_at: None,
            last_updated_at: now(),
            uses,
            narrative,
        }
    }

    /// Refresh the last-updated stamp.
    pub fn touch(&mut self) {
        self.last_updated_at = now();
    }
}
