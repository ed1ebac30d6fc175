//! Persistence for Storyloom sessions: a repository seam, a JSON file
//! store behind it, and per-session write serialization.
//!
//! The domain core treats storage as an external collaborator that can
//! load and save whole [`storyloom_core::SessionContext`] records. This
//! crate provides:
//!
//! - [`SessionRepository`] — the async trait the engine works against.
//! - [`FileSessionStore`] — the default implementation: one JSON file per
//!   collection, written atomically (temp file, fsync, rename).
//! - [`SessionLocks`] — a mutex per session id, so every read-modify-write
//!   cycle on a session runs alone.
//! - [`ProjectStore`] — the small project registry kept next to the
//!   session data.

pub mod config;
pub mod error;
pub mod file;
pub mod locks;
pub mod projects;
pub mod repository;

pub use config::StoreConfig;
pub use error::StoreError;
pub use file::FileSessionStore;
pub use locks::SessionLocks;
pub use projects::{Project, ProjectStore};
pub use repository::SessionRepository;
