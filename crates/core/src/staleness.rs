//! Staleness checking: recorded "uses" versions vs the current ledger.
//!
//! Every generated chain and scene detail carries a [`UsesWitness`] stamped
//! at generation time with the ledger values it was built against. Before an
//! operation builds on that artifact, the witness is compared against the
//! current ledger; ANY upstream relock (even a no-op relock) invalidates the
//! snapshot, because locking is the commit point and re-locking always means
//! "content may have changed".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::VersionLedger;

// ---------------------------------------------------------------------------
// Witness types
// ---------------------------------------------------------------------------

/// Ledger values recorded at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsesVersions {
    pub background_v: u64,
    pub characters_v: u64,
    /// Versions of the previous scene details this artifact consumed,
    /// keyed by scene id. Empty for chains and for the first scene.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prev_scene_v: BTreeMap<String, u64>,
    /// Combined snapshot at stamp time (`background_v * 1000 + characters_v`).
    pub macro_snapshot_v: u64,
}

impl UsesVersions {
    /// Stamp a witness from the current ledger state.
    pub fn stamp(ledger: &VersionLedger) -> Self {
        Self {
            background_v: ledger.background_v,
            characters_v: ledger.characters_v,
            prev_scene_v: BTreeMap::new(),
            macro_snapshot_v: ledger.snapshot_version(),
        }
    }

    /// Record the version of a previous scene detail this artifact consumed.
    pub fn with_prev_scene(mut self, scene_id: impl Into<String>, version: u64) -> Self {
        self.prev_scene_v.insert(scene_id.into(), version);
        self
    }
}

/// The staleness witness of a chain or scene detail.
///
/// "Never recorded" is a distinct named state rather than a null: every
/// staleness read treats it as stale, and the distinction lets error
/// messages say "never validated" instead of inventing version numbers.
///
/// Serialized untagged so that a recorded witness is a plain object and an
/// absent one is `null`, matching the stored record layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsesWitness {
    Recorded(UsesVersions),
    #[default]
    NeverRecorded,
}

impl UsesWitness {
    pub fn recorded(&self) -> Option<&UsesVersions> {
        match self {
            UsesWitness::Recorded(uses) => Some(uses),
            UsesWitness::NeverRecorded => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Conservative staleness predicate.
///
/// True if the witness was never recorded, or if either recorded counter
/// differs from the current ledger in any direction.
pub fn is_stale(uses: &UsesWitness, ledger: &VersionLedger) -> bool {
    match uses.recorded() {
        None => true,
        Some(uses) => {
            uses.background_v != ledger.background_v || uses.characters_v != ledger.characters_v
        }
    }
}

/// One side of a decomposed staleness comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionPair {
    pub background_v: u64,
    pub characters_v: u64,
}

/// Decomposed result of comparing a witness against the current ledger, so
/// callers can tell the user precisely what to regenerate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneVersionCheck {
    pub is_stale: bool,
    pub is_background_stale: bool,
    pub is_characters_stale: bool,
    pub current_versions: VersionPair,
    /// `None` when the artifact was never validated against any ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_versions: Option<VersionPair>,
}

/// Compare a witness against the current ledger, field by field.
pub fn validate_scene_version(uses: &UsesWitness, ledger: &VersionLedger) -> SceneVersionCheck {
    let current_versions = VersionPair {
        background_v: ledger.background_v,
        characters_v: ledger.characters_v,
    };
    match uses.recorded() {
        None => SceneVersionCheck {
            is_stale: true,
            is_background_stale: true,
            is_characters_stale: true,
            current_versions,
            scene_versions: None,
        },
        Some(uses) => {
            let is_background_stale = uses.background_v != ledger.background_v;
            let is_characters_stale = uses.characters_v != ledger.characters_v;
            SceneVersionCheck {
                is_stale: is_background_stale || is_characters_stale,
                is_background_stale,
                is_characters_stale,
                current_versions,
                scene_versions: Some(VersionPair {
                    background_v: uses.background_v,
                    characters_v: uses.characters_v,
                }),
            }
        }
    }
}

impl SceneVersionCheck {
    /// Build the human-readable staleness error for this check, naming the
    /// artifact and enumerating exactly which upstream blocks moved.
    ///
    /// Returns `None` when the check is fresh.
    pub fn to_error(&self, what: &str) -> Option<CoreError> {
        if !self.is_stale {
            return None;
        }
        let Some(recorded) = self.scene_versions else {
            return Some(CoreError::StaleContext(format!(
                "{what} was never validated against the current context"
            )));
        };
        let mut moved = Vec::new();
        if self.is_background_stale {
            moved.push(format!(
                "background (v{} -> v{})",
                recorded.background_v, self.current_versions.background_v
            ));
        }
        if self.is_characters_stale {
            moved.push(format!(
                "characters (v{} -> v{})",
                recorded.characters_v, self.current_versions.characters_v
            ));
        }
        Some(CoreError::StaleContext(format!(
            "{what} was generated against outdated context: {} changed since",
            moved.join(" and ")
        )))
    }
}

/// Refuse to proceed when the witness no longer matches the ledger.
pub fn ensure_fresh(
    uses: &UsesWitness,
    ledger: &VersionLedger,
    what: &str,
) -> Result<(), CoreError> {
    match validate_scene_version(uses, ledger).to_error(what) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(background_v: u64, characters_v: u64) -> VersionLedger {
        let mut ledger = VersionLedger::new();
        for _ in 0..background_v {
            ledger.bump_background();
        }
        for _ in 0..characters_v {
            ledger.bump_characters();
        }
        ledger
    }

    // -- is_stale --

    #[test]
    fn matching_versions_are_fresh() {
        let meta = ledger(2, 3);
        let uses = UsesWitness::Recorded(UsesVersions::stamp(&meta));
        assert!(!is_stale(&uses, &meta));
    }

    #[test]
    fn any_counter_difference_is_stale() {
        let stamped = ledger(2, 3);
        let uses = UsesWitness::Recorded(UsesVersions::stamp(&stamped));

        let mut moved = ledger(2, 3);
        moved.bump_background();
        assert!(is_stale(&uses, &moved));

        let mut moved = ledger(2, 3);
        moved.bump_characters();
        assert!(is_stale(&uses, &moved));
    }

    #[test]
    fn never_recorded_is_always_stale() {
        assert!(is_stale(&UsesWitness::NeverRecorded, &ledger(0, 0)));
        assert!(is_stale(&UsesWitness::NeverRecorded, &ledger(5, 5)));
    }

    // -- validate_scene_version --

    #[test]
    fn decomposed_check_isolates_the_moved_counter() {
        let stamped = ledger(1, 1);
        let uses = UsesWitness::Recorded(UsesVersions::stamp(&stamped));

        let mut meta = ledger(1, 1);
        meta.bump_background();
        let check = validate_scene_version(&uses, &meta);
        assert!(check.is_stale);
        assert!(check.is_background_stale);
        assert!(!check.is_characters_stale);
        assert_eq!(check.current_versions.background_v, 2);
        assert_eq!(check.scene_versions.unwrap().background_v, 1);
    }

    #[test]
    fn stale_error_enumerates_moved_blocks() {
        let stamped = ledger(1, 1);
        let uses = UsesWitness::Recorded(UsesVersions::stamp(&stamped));
        let mut meta = ledger(1, 1);
        meta.bump_background();

        let err = validate_scene_version(&uses, &meta)
            .to_error("macro chain chain_1")
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("background (v1 -> v2)"));
        assert!(!msg.contains("characters ("));
    }

    #[test]
    fn never_recorded_error_says_never_validated() {
        let err = validate_scene_version(&UsesWitness::NeverRecorded, &ledger(1, 0))
            .to_error("scene detail scene_2")
            .unwrap();
        assert!(err.to_string().contains("never validated"));
    }

    #[test]
    fn fresh_check_produces_no_error() {
        let meta = ledger(1, 2);
        let uses = UsesWitness::Recorded(UsesVersions::stamp(&meta));
        assert!(validate_scene_version(&uses, &meta).to_error("x").is_none());
        assert!(ensure_fresh(&uses, &meta, "x").is_ok());
    }

    // -- serde --

    #[test]
    fn witness_serializes_as_object_or_null() {
        let meta = ledger(1, 2);
        let recorded = UsesWitness::Recorded(UsesVersions::stamp(&meta));
        let value = serde_json::to_value(&recorded).unwrap();
        assert_eq!(value["backgroundV"], 1);
        assert_eq!(value["charactersV"], 2);
        assert_eq!(value["macroSnapshotV"], 1002);

        let never = serde_json::to_value(UsesWitness::NeverRecorded).unwrap();
        assert!(never.is_null());

        let back: UsesWitness = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(back, UsesWitness::NeverRecorded);
    }

    #[test]
    fn prev_scene_versions_round_trip() {
        let meta = ledger(1, 1);
        let uses = UsesVersions::stamp(&meta).with_prev_scene("scene_1", 4);
        let value = serde_json::to_value(&uses).unwrap();
        assert_eq!(value["prevSceneV"]["scene_1"], 4);
    }
}
