use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::Session;
use crate::config::AdminSeed;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Who is signed in. Cleared whenever the workspace changes.
    pub session: Option<Session>,
    pub admin_seed: AdminSeed,
}

impl AppState {
    pub fn new(admin_seed: AdminSeed) -> Self {
        AppState {
            workspace: None,
            db: None,
            session: None,
            admin_seed,
        }
    }
}
