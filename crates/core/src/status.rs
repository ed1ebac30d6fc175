//! Artifact status state machine shared by macro chains and scene details.
//!
//! ```text
//! Draft --generate--> Generated --edit--> Edited --lock--> Locked
//! Generated --lock--> Locked
//! Locked --unlock--> Edited
//! Generated/Edited/Locked --(upstream change)--> NeedsRegen
//! NeedsRegen --regenerate--> Generated
//! ```
//!
//! `Locked` is the only state that unblocks dependent generation; every
//! other state means the artifact's content is not yet committed.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a generated artifact (macro chain or scene detail).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    /// Created but never generated.
    #[default]
    Draft,
    /// Content was produced by the generation collaborator.
    Generated,
    /// Content was manually changed since generation or unlock.
    Edited,
    /// Finalized; dependents may build on this.
    Locked,
    /// An upstream change invalidated this content; it still exists but
    /// must be regenerated before it can be trusted or locked again.
    NeedsRegen,
}

impl ArtifactStatus {
    /// Wire/storage name of the status, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Draft => "Draft",
            ArtifactStatus::Generated => "Generated",
            ArtifactStatus::Edited => "Edited",
            ArtifactStatus::Locked => "Locked",
            ArtifactStatus::NeedsRegen => "NeedsRegen",
        }
    }

    pub fn is_locked(self) -> bool {
        matches!(self, ArtifactStatus::Locked)
    }

    /// A locked artifact refuses direct content edits until unlocked.
    pub fn editable(self) -> bool {
        !self.is_locked()
    }

    /// Only `Locked` unblocks dependent generation (next scene, chain
    /// finalization); all other states block forward progress.
    pub fn unblocks_dependents(self) -> bool {
        self.is_locked()
    }

    /// Whether `self -> next` is an edge of the status machine.
    pub fn can_transition_to(self, next: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        matches!(
            (self, next),
            (Draft, Generated)
                | (Generated, Edited)
                | (Generated, Locked)
                | (Edited, Edited)
                | (Edited, Locked)
                | (Locked, Edited)
                | (Generated, NeedsRegen)
                | (Locked, NeedsRegen)
                | (Edited, NeedsRegen)
                | (NeedsRegen, Generated)
        )
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArtifactStatus::*;

    #[test]
    fn default_is_draft() {
        assert_eq!(ArtifactStatus::default(), Draft);
    }

    #[test]
    fn only_locked_unblocks_dependents() {
        assert!(Locked.unblocks_dependents());
        for status in [Draft, Generated, Edited, NeedsRegen] {
            assert!(!status.unblocks_dependents(), "{status} should block");
        }
    }

    #[test]
    fn locked_is_not_editable() {
        assert!(!Locked.editable());
        assert!(Edited.editable());
        assert!(NeedsRegen.editable());
    }

    #[test]
    fn lock_edges() {
        assert!(Generated.can_transition_to(Locked));
        assert!(Edited.can_transition_to(Locked));
        assert!(!Draft.can_transition_to(Locked));
        assert!(!NeedsRegen.can_transition_to(Locked));
    }

    #[test]
    fn unlock_always_lands_on_edited() {
        assert!(Locked.can_transition_to(Edited));
        assert!(!Locked.can_transition_to(Generated));
        assert!(!Locked.can_transition_to(Draft));
    }

    #[test]
    fn upstream_changes_reach_any_committed_state() {
        for status in [Generated, Edited, Locked] {
            assert!(status.can_transition_to(NeedsRegen), "{status}");
        }
        assert!(!Draft.can_transition_to(NeedsRegen));
    }

    #[test]
    fn regeneration_recovers_from_needs_regen() {
        assert!(NeedsRegen.can_transition_to(Generated));
        assert!(!NeedsRegen.can_transition_to(Edited));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&NeedsRegen).unwrap();
        assert_eq!(json, "\"NeedsRegen\"");
        let back: ArtifactStatus = serde_json::from_str("\"Locked\"").unwrap();
        assert_eq!(back, Locked);
    }
}
