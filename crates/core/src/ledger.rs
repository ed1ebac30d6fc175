//! Version ledger: monotonic counters for the gate-keeping blocks.

use serde::{Deserialize, Serialize};

use crate::types::{now, Timestamp};

/// Multiplier encoding both counters into one snapshot integer.
const SNAPSHOT_BASE: u64 = 1000;

/// Monotonic version counters for the two gate-keeping blocks.
///
/// `background_v` and `characters_v` start at 0 and increment by exactly 1
/// on each unlocked→locked transition of their block. There is no decrement:
/// versions only grow for the lifetime of a session, which keeps every
/// staleness comparison a plain equality check instead of vector-clock
/// reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionLedger {
    #[serde(default)]
    pub background_v: u64,
    #[serde(default)]
    pub characters_v: u64,
    #[serde(default = "now", with = "crate::types::ts")]
    pub updated_at: Timestamp,
}

impl VersionLedger {
    /// Ledger at its zero state.
    pub fn new() -> Self {
        Self {
            background_v: 0,
            characters_v: 0,
            updated_at: now(),
        }
    }

    /// Record a background unlocked→locked transition.
    pub fn bump_background(&mut self) {
        self.background_v += 1;
        self.updated_at = now();
    }

    /// Record a characters unlocked→locked transition.
    pub fn bump_characters(&mut self) {
        self.characters_v += 1;
        self.updated_at = now();
    }

    /// Combined snapshot version: `background_v * 1000 + characters_v`.
    ///
    /// Always recomputed, never stored as a source of truth. The encoding
    /// silently aliases if `characters_v` reaches 1000 within a single
    /// background epoch; that is an accepted bound of the scheme, not a
    /// guarded invariant.
    pub fn snapshot_version(&self) -> u64 {
        self.background_v * SNAPSHOT_BASE + self.characters_v
    }
}

impl Default for VersionLedger {
    fn default() -> Self {
        Self::new()
    }
}
