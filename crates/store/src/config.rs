//! Storage configuration.

use std::path::PathBuf;

/// Storage configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the JSON data files (default: `.data`).
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `STORYLOOM_DATA_DIR` | `.data` |
    pub fn from_env() -> Self {
        let data_dir = std::env::var("STORYLOOM_DATA_DIR")
            .unwrap_or_else(|_| ".data".into())
            .into();
        Self { data_dir }
    }

    /// Configuration rooted at an explicit directory.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}
