//! Persisted login session.
//!
//! Holds the bearer token between `fo` invocations. A 401 from any call
//! clears it, which is how a forced logout looks from the command line.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const STATE_DIR_ENV: &str = "FIELDOPS_STATE_DIR";
const SESSION_FILE: &str = "session.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub username: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(access_token: String, token_type: String, username: Option<String>) -> Self {
        Self {
            access_token,
            token_type,
            username,
            saved_at: Utc::now(),
        }
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Where session state lives: `FIELDOPS_STATE_DIR`, else the platform state
/// dir (falling back to the data dir where no state dir exists).
#[must_use]
pub fn default_state_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(STATE_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("fieldops"))
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Store rooted at [`default_state_dir`].
    pub fn open_default() -> Result<Self> {
        let dir = default_state_dir().context("Could not determine a state directory")?;
        Ok(Self::in_dir(&dir))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let session = toml::from_str::<Session>(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let body = toml::to_string(session).context("Failed to encode session")?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "session cleared");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::in_dir(&dir.path().join("nested"));

        assert_eq!(store.load().expect("load"), None);

        let session = Session::new("tok-123".into(), "bearer".into(), Some("dana".into()));
        store.save(&session).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.access_token, "tok-123");
        assert_eq!(loaded.username.as_deref(), Some("dana"));

        assert!(store.clear().expect("clear"));
        assert!(!store.clear().expect("second clear"));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::in_dir(dir.path());
        std::fs::write(store.path(), "access_token = ").expect("write");
        assert!(store.load().is_err());
    }
}
