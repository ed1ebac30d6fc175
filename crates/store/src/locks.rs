//! Per-session mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One mutex per session id, created on first use.
///
/// Every engine operation holds its session's mutex for the whole
/// read-modify-write cycle, so two concurrent lock calls on the same
/// entity can never both pass their guard check and silently lose an
/// update. Different sessions never contend.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutex for one session, waiting if another operation on
    /// the same session is in flight.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut registry = self.inner.lock().await;
            registry
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}
