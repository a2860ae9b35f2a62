use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Identity and account flags held client-side for the signed-in user.
///
/// There is no client-side expiry check: a token is trusted until the
/// backend answers 401, at which point the session is cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub force_password_change: bool,
    pub created_at: DateTime<Utc>,
}

pub struct Session {
    data_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data: None,
        }
    }

    /// Restore a persisted session from disk.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;
            self.data = Some(data);
            return Ok(true);
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data and remove the persisted file
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Replace the session after a login or password change
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.username.as_str())
    }

    /// A session is authenticated iff it holds a token, independent of
    /// the token's content or age.
    pub fn is_authenticated(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.data.as_ref().map(|d| d.role.is_admin()).unwrap_or(false)
    }

    /// Whether the account must change its provisional password before
    /// doing anything else.
    pub fn force_password_change(&self) -> bool {
        self.data
            .as_ref()
            .map(|d| d.force_password_change)
            .unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}
