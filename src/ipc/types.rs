use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::SessionTable;
use crate::config::Config;
use crate::db;
use crate::documents::DocumentStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// Token from `auth.login`.
    #[serde(default)]
    pub session: Option<String>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub sessions: SessionTable,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            workspace: None,
            db: None,
            sessions: SessionTable::default(),
            config,
        }
    }

    /// Sessions belong to one workspace and are dropped on a switch.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        self.db = Some(conn);
        self.workspace = Some(path.to_path_buf());
        self.sessions.clear();
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(())
    }

    pub fn documents(&self) -> Option<DocumentStore> {
        self.workspace
            .as_deref()
            .map(|ws| DocumentStore::for_workspace(ws, self.config.max_upload_bytes))
    }
}
