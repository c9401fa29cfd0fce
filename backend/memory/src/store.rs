//! File-backed session persistence: one JSON file per session id.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use mnemo_core::SessionMemory;

/// Durable per-session storage.
///
/// A reader never observes a half-written record: saves go to a temp file
/// that is renamed over the destination.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create memory dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_session_id(session_id)))
    }

    /// Load a session's memory, or a fresh empty one when the record is
    /// missing, unreadable, or corrupt. Corruption is logged and swallowed
    /// so the pipeline stays available.
    pub async fn load(&self, session_id: &str) -> SessionMemory {
        let path = self.path_for(session_id);
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<SessionMemory>(&bytes) {
                Ok(memory) => memory,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Corrupt session record, starting fresh");
                    SessionMemory::new(session_id)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => SessionMemory::new(session_id),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Unreadable session record, starting fresh");
                SessionMemory::new(session_id)
            }
        }
    }

    /// Persist a session's memory, refreshing `updated_at`.
    pub async fn save(&self, memory: &mut SessionMemory) -> Result<()> {
        memory.updated_at = Utc::now();
        let path = self.path_for(&memory.session_id);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(memory)
            .context("failed to serialize session memory")?;
        fs::write(&tmp, &json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;

        debug!(session_id = %memory.session_id, "Session memory saved");
        Ok(())
    }

    /// Remove a session's record. Idempotent: absent records are not an error.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(session_id = %session_id, "Session memory deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
        }
    }

    /// Whether a persisted record exists for this session id.
    pub async fn exists(&self, session_id: &str) -> bool {
        fs::try_exists(self.path_for(session_id)).await.unwrap_or(false)
    }
}

/// Map a session id to a safe file-name stem. Anything outside
/// `[A-Za-z0-9._-]` becomes `_`, so a hostile id cannot escape the store dir.
fn sanitize_session_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
