use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn open_workspace(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let conn = crate::db::open_db(&path)?;
        tracing::info!(workspace = %path.display(), "workspace opened");
        self.workspace = Some(path);
        self.db = Some(conn);
        Ok(())
    }
}
