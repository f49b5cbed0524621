use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// The signed-in viewer, as persisted alongside the token by whatever login
/// flow produced it. Only the fields this client needs.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Viewer {
    pub id: String,
    pub username: String,
}

/// Persisted session: bearer token plus the viewer it belongs to.
#[derive(Debug, Clone, serde::Deserialize)]
struct PersistedSession {
    token: String,
    viewer: Viewer,
}

/// Holds the bearer token for the current session.
///
/// The token is written by the login flow (out of scope here) to a JSON file
/// under the user config dir; this store only reads it, attaches it to
/// requests, and clears it when the backend answers 401.
#[derive(Clone)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
    viewer: Arc<RwLock<Option<Viewer>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Load the session from `path`, or from the default location under the
    /// user config dir when `path` is `None`. A missing or unreadable file
    /// just yields an empty store; the app then shows the signed-out state.
    pub fn load(path: Option<PathBuf>) -> Self {
        let path = path.or_else(Self::default_path);
        let mut token = None;
        let mut viewer = None;

        if let Some(p) = &path {
            match fs::read_to_string(p) {
                Ok(content) => match serde_json::from_str::<PersistedSession>(&content) {
                    Ok(session) => {
                        token = Some(session.token);
                        viewer = Some(session.viewer);
                        tracing::info!("Loaded session from {}", p.display());
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse session file {}: {}", p.display(), e);
                    }
                },
                Err(_) => {
                    tracing::info!("No session file at {}", p.display());
                }
            }
        }

        Self {
            token: Arc::new(RwLock::new(token)),
            viewer: Arc::new(RwLock::new(viewer)),
            path,
        }
    }

    #[cfg(test)]
    pub fn with_token(token: impl Into<String>, viewer_id: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
            viewer: Arc::new(RwLock::new(Some(Viewer {
                id: viewer_id.into(),
                username: "tester".to_string(),
            }))),
            path: None,
        }
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tui-media-app").join("session.json"))
    }

    pub fn bearer(&self) -> Option<String> {
        self.token.read().ok()?.clone()
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.viewer.read().ok()?.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.bearer().is_some()
    }

    /// Drop the token (401 handling). The persisted file is removed so the
    /// next start goes straight to the signed-out state.
    pub fn clear(&self) {
        if let Ok(mut token) = self.token.write() {
            *token = None;
        }
        if let Ok(mut viewer) = self.viewer.write() {
            *viewer = None;
        }
        if let Some(p) = &self.path {
            if p.exists() {
                if let Err(e) = fs::remove_file(p) {
                    tracing::error!("Failed to remove session file {}: {}", p.display(), e);
                }
            }
        }
    }
}
