use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::{Session, SessionCollection};
use crate::error::{ParleyError, Result};

/// Durable home of the [`SessionCollection`]: a single JSON document that is
/// rewritten in full on every save.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole collection. A missing file is an empty collection.
    pub fn load(&self) -> Result<SessionCollection> {
        if !self.path.exists() {
            return Ok(SessionCollection::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            ParleyError::persistence(format!(
                "Failed to read sessions file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let sessions: SessionCollection = serde_json::from_str(&contents).map_err(|e| {
            ParleyError::persistence(format!(
                "Failed to parse sessions file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %self.path.display(), count = sessions.len(), "Loaded sessions");
        Ok(sessions)
    }

    /// Overwrite the backing file with the full collection.
    pub fn save(&self, sessions: &SessionCollection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ParleyError::persistence(format!(
                        "Failed to create sessions directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(sessions).map_err(|e| {
            ParleyError::persistence(format!("Failed to serialize sessions: {}", e))
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| {
            ParleyError::persistence(format!("Failed to write temporary sessions file: {}", e))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            ParleyError::persistence(format!("Failed to rename sessions file: {}", e))
        })?;

        tracing::debug!(path = %self.path.display(), count = sessions.len(), "Saved sessions");
        Ok(())
    }

    /// Create an empty session, add it to `sessions` and persist immediately.
    pub fn create_session(&self, sessions: &mut SessionCollection) -> Result<Session> {
        let session = create_new_session(sessions, Local::now());
        self.save(sessions)?;
        tracing::debug!(id = %session.id, "Created session");
        Ok(session)
    }
}

/// Build a session stamped at `now` and insert it into `sessions`.
///
/// Ids are regenerated until they are free in the collection.
pub fn create_new_session(sessions: &mut SessionCollection, now: DateTime<Local>) -> Session {
    let mut id = generate_session_id(now);
    while sessions.contains(&id) {
        id = generate_session_id(now);
    }

    let session = Session::new(id, now.to_rfc3339());
    sessions.insert(session.clone());
    session
}

/// `YYYYMMDD_HHMMSS_mmm-xxxx`: sorts chronologically and is safe in file names.
pub fn generate_session_id(now: DateTime<Local>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%d_%H%M%S_%3f"), &suffix[..4])
}
