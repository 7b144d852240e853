//! Persistence of the Matrix login between restarts.

use std::path::{Path, PathBuf};

use log::{debug, trace};
use matrix_sdk::authentication::matrix::MatrixSession;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Content of the session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    /// Access token and device of the bot account
    user_session: MatrixSession,

    /// Position of the last sync, absent until the first sync completes
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Data directory of the bot.
///
/// The directory contains:
/// - `session`: JSON file with the login and the last sync token
/// - `sqlite`: SQLite state store of the Matrix SDK
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_path: PathBuf,
    sqlite_path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &str) -> Self {
        let data_dir = Path::new(data_dir);
        debug!("use data directory {}", data_dir.display());

        SessionStore {
            session_path: data_dir.join("session"),
            sqlite_path: data_dir.join("sqlite"),
        }
    }

    /// Path of the SQLite state store.
    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// Reads the stored session, `None` when there is none or it is unreadable.
    async fn read(&self) -> Option<StoredSession> {
        let content = fs::read_to_string(&self.session_path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!("ignore unreadable session file: {:?}", e);
                None
            }
        }
    }

    /// Returns the stored login, if any.
    pub async fn user_session(&self) -> Option<MatrixSession> {
        self.read().await.map(|stored| stored.user_session)
    }

    /// Returns the stored sync token, if any.
    pub async fn sync_token(&self) -> Option<String> {
        self.read().await.and_then(|stored| stored.sync_token)
    }

    /// Writes a fresh login, dropping any previous sync token.
    pub async fn save_user_session(&self, user_session: &MatrixSession) -> anyhow::Result<()> {
        trace!("persist user session");

        if let Some(parent) = self.session_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        self.write(&StoredSession {
            user_session: user_session.clone(),
            sync_token: None,
        })
        .await
    }

    /// Records the position of the last sync next to the stored login.
    ///
    /// # Errors
    ///
    /// Returns an error if no login is stored or the file cannot be written.
    pub async fn save_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let Some(mut stored) = self.read().await else {
            anyhow::bail!("no session stored at {}", self.session_path.display());
        };
        stored.sync_token = Some(sync_token);
        self.write(&stored).await
    }

    async fn write(&self, stored: &StoredSession) -> anyhow::Result<()> {
        let content = serde_json::to_string(stored)?;
        fs::write(&self.session_path, content).await?;
        Ok(())
    }
}
