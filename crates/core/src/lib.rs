//! Storyloom domain core: the versioned, lock-gated session model behind
//! the campaign authoring pipeline.
//!
//! A campaign is built stage by stage (background → characters → scene chain
//! → per-scene details), and every stage depends on upstream stages being
//! locked. This crate owns the rules of that dependency graph:
//!
//! - [`SessionContext`] — the aggregate root holding all per-session
//!   artifacts, their lock states, and the version ledger.
//! - [`VersionLedger`] — monotonic counters for the gate-keeping blocks,
//!   plus the derived snapshot version.
//! - [`lock`] — the single authority for lock/unlock transitions and
//!   their side effects (version bumps, cascading invalidation).
//! - [`invalidation`] — forward-only soft invalidation: downstream
//!   artifacts are marked [`ArtifactStatus::NeedsRegen`] without
//!   discarding their content.
//! - [`staleness`] — compares an artifact's recorded [`UsesWitness`]
//!   against the current ledger to decide whether it can still be
//!   trusted.
//!
//! Everything here is pure, synchronous state transformation; persistence
//! and orchestration live in the `storyloom-store` and `storyloom-engine`
//! crates.

pub mod block;
pub mod chain;
pub mod characters;
pub mod context;
pub mod error;
pub mod gating;
pub mod invalidation;
pub mod ledger;
pub mod lock;
pub mod merge;
pub mod policy;
pub mod scene;
pub mod staleness;
pub mod status;
pub mod types;

pub use block::BlockType;
pub use chain::{MacroChain, MacroScene};
pub use characters::CharactersBlock;
pub use context::SessionContext;
pub use error::CoreError;
pub use ledger::VersionLedger;
pub use scene::{ContextOut, SceneDetail, WorldSeeds};
pub use staleness::{SceneVersionCheck, UsesVersions, UsesWitness};
pub use status::ArtifactStatus;
