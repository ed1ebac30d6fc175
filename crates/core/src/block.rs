//! Context block types and their allow-lists.
//!
//! A block is a named, independently lockable unit of campaign data held in
//! the session context. Block payloads are opaque to the core except for
//! `characters` (see [`crate::characters`]); the core only cares about which
//! blocks exist, which may be locked, and which accept appends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A named block slot in the session context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Blueprint,
    PlayerHooks,
    WorldSeeds,
    StylePrefs,
    Custom,
    Background,
    StoryConcept,
    Characters,
    /// Accumulated facts contributed by locked scenes. Append-only.
    StoryFacts,
    /// Accumulated world-state deltas contributed by locked scenes.
    /// Written only via scene locking, never via direct append.
    WorldState,
}

/// Blocks that may be locked/unlocked.
pub const LOCKABLE_BLOCKS: &[BlockType] = &[
    BlockType::Blueprint,
    BlockType::PlayerHooks,
    BlockType::WorldSeeds,
    BlockType::StylePrefs,
    BlockType::Custom,
    BlockType::Background,
    BlockType::StoryConcept,
    BlockType::Characters,
];

/// Blocks that accept direct appends from the client.
pub const APPENDABLE_BLOCKS: &[BlockType] = &[
    BlockType::Blueprint,
    BlockType::PlayerHooks,
    BlockType::WorldSeeds,
    BlockType::StylePrefs,
    BlockType::Custom,
    BlockType::StoryFacts,
    BlockType::Background,
    BlockType::StoryConcept,
    BlockType::Characters,
];

impl BlockType {
    /// Wire/storage name of the block, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Blueprint => "blueprint",
            BlockType::PlayerHooks => "player_hooks",
            BlockType::WorldSeeds => "world_seeds",
            BlockType::StylePrefs => "style_prefs",
            BlockType::Custom => "custom",
            BlockType::Background => "background",
            BlockType::StoryConcept => "story_concept",
            BlockType::Characters => "characters",
            BlockType::StoryFacts => "story_facts",
            BlockType::WorldState => "world_state",
        }
    }

    pub fn is_lockable(self) -> bool {
        LOCKABLE_BLOCKS.contains(&self)
    }

    pub fn is_appendable(self) -> bool {
        APPENDABLE_BLOCKS.contains(&self)
    }

    /// Validate that this block may be locked/unlocked.
    pub fn ensure_lockable(self) -> Result<(), CoreError> {
        if self.is_lockable() {
            Ok(())
        } else {
            Err(CoreError::InvalidBlockType(format!(
                "'{self}' is not lockable. Must be one of: {}",
                names(LOCKABLE_BLOCKS)
            )))
        }
    }

    /// Validate that this block accepts direct appends.
    pub fn ensure_appendable(self) -> Result<(), CoreError> {
        if self.is_appendable() {
            Ok(())
        } else {
            Err(CoreError::InvalidBlockType(format!(
                "'{self}' does not accept appends. Must be one of: {}",
                names(APPENDABLE_BLOCKS)
            )))
        }
    }
}

fn names(kinds: &[BlockType]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blueprint" => Ok(BlockType::Blueprint),
            "player_hooks" => Ok(BlockType::PlayerHooks),
            "world_seeds" => Ok(BlockType::WorldSeeds),
            "style_prefs" => Ok(BlockType::StylePrefs),
            "custom" => Ok(BlockType::Custom),
            "background" => Ok(BlockType::Background),
            "story_concept" => Ok(BlockType::StoryConcept),
            "characters" => Ok(BlockType::Characters),
            "story_facts" => Ok(BlockType::StoryFacts),
            "world_state" => Ok(BlockType::WorldState),
            other => Err(CoreError::InvalidBlockType(format!(
                "'{other}' is not a known block type"
            ))),
        }
    }
}
