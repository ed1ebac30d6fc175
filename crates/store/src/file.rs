//! JSON file storage with atomic writes.
//!
//! Layout under the data directory:
//!
//! - `context.json` — map of session id to session record
//! - `chains.json` — legacy standalone chain store, map of chain id to chain
//! - `projects.json` — array of project records (see [`crate::projects`])
//!
//! Every write goes to a temp file first, is fsynced, then renamed over
//! the target. A crash can lose the newest write but never leaves a torn
//! file. An unparsable data file is reported as an error rather than
//! treated as empty, so one bad byte cannot silently wipe every session
//! on the next save.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use storyloom_core::{MacroChain, SessionContext};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::repository::SessionRepository;

const CONTEXT_FILE: &str = "context.json";
const CHAINS_FILE: &str = "chains.json";

/// Write `bytes` to `dir/name` atomically: temp file, fsync, rename,
/// then fsync the directory so the rename itself is durable.
pub(crate) async fn write_atomic(
    dir: &Path,
    name: &str,
    bytes: Vec<u8>,
) -> Result<(), StoreError> {
    fs::create_dir_all(dir).await?;
    let target = dir.join(name);
    let tmp = dir.join(format!("{name}.tmp"));

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, &target).await?;

    #[cfg(unix)]
    {
        if let Ok(dir) = std::fs::File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Read `dir/name` as a JSON object, treating a missing file as empty.
pub(crate) async fn read_object(
    dir: &Path,
    name: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, StoreError> {
    match fs::read(dir.join(name)).await {
        Ok(bytes) => {
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            match value {
                serde_json::Value::Object(map) => Ok(map),
                _ => Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{name} is not a JSON object"),
                )
                .into()),
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::Map::new()),
        Err(err) => Err(err.into()),
    }
}

/// The default [`SessionRepository`]: whole-file JSON persistence.
pub struct FileSessionStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on the data files. Per-session
    /// exclusion is layered on top by the engine.
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            dir: config.data_dir.clone(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl SessionRepository for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionContext>, StoreError> {
        let contexts = read_object(&self.dir, CONTEXT_FILE).await?;
        let Some(record) = contexts.get(session_id) else {
            debug!(session_id, "session record not found");
            return Ok(None);
        };
        let session = SessionContext::from_value(session_id, record.clone())?;
        debug!(
            session_id,
            version = session.version,
            chains = session.macro_chains.len(),
            "session record loaded"
        );
        Ok(Some(session))
    }

    async fn save(&self, session: &SessionContext) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut contexts = read_object(&self.dir, CONTEXT_FILE).await?;
        contexts.insert(
            session.session_id.clone(),
            serde_json::to_value(session)?,
        );
        let bytes = serde_json::to_vec_pretty(&serde_json::Value::Object(contexts))?;
        write_atomic(&self.dir, CONTEXT_FILE, bytes).await?;
        debug!(
            session_id = %session.session_id,
            version = session.version,
            "session record saved"
        );
        Ok(())
    }

    async fn load_legacy_chain(&self, chain_id: &str) -> Result<Option<MacroChain>, StoreError> {
        let chains = read_object(&self.dir, CHAINS_FILE).await?;
        match chains.get(chain_id) {
            None => Ok(None),
            Some(record) => {
                debug!(chain_id, "chain found in legacy store");
                Ok(Some(serde_json::from_value(record.clone())?))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
