use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::channel::DEFAULT_RECONNECT_DELAY;
use crate::core::history::FileStore;
use crate::ui::markdown::DEFAULT_DOWNLOAD_PREFIX;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const SERVER_URL_ENV: &str = "ASK_CBIOPORTAL_URL";
pub const MODEL_ENV: &str = "MODEL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Forwarded to the backend as `modelHint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_highlighting: Option<bool>,
    /// Directory holding conversation history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Config {
    /// Applies `ASK_CBIOPORTAL_URL` and `MODEL` on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(SERVER_URL_ENV).and_then(non_empty) {
            self.server_url = Some(url);
        }
        if let Some(model) = lookup(MODEL_ENV).and_then(non_empty) {
            self.model = Some(model);
        }
        self
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RECONNECT_DELAY)
    }

    pub fn download_prefix(&self) -> &str {
        self.download_prefix
            .as_deref()
            .unwrap_or(DEFAULT_DOWNLOAD_PREFIX)
    }

    pub fn syntax_highlighting(&self) -> bool {
        self.syntax_highlighting.unwrap_or(true)
    }

    pub fn history_dir(&self) -> Option<PathBuf> {
        self.history_path.clone().or_else(FileStore::default_dir)
    }
}
