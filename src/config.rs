use std::path::Path;

use serde::Deserialize;

/// Configuration loaded from `comment-watch.toml` at the watched root.
#[derive(Debug, Deserialize, Default)]
pub struct CommentWatchConfig {
    /// Marker token looked for in file content (default: "agent").
    pub marker: Option<String>,
    /// Single character that arms a marker as a fire-now trigger (default: "!").
    pub trigger_prefix: Option<String>,
    /// Additional ignored-path regexes (beyond the built-in defaults).
    pub exclude: Option<Vec<String>>,
    /// Watch-session tuning.
    #[serde(default)]
    pub watch: WatchSection,
}

/// The `[watch]` table.
#[derive(Debug, Deserialize, Default)]
pub struct WatchSection {
    /// Quiet time in milliseconds before a file's events are delivered.
    pub debounce_ms: Option<u64>,
    /// Poll interval in milliseconds for the notify polling fallback.
    pub poll_interval_ms: Option<u64>,
    /// Scan files that already exist when the watch starts.
    pub include_existing: Option<bool>,
}

impl CommentWatchConfig {
    /// Load configuration from `comment-watch.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or
    /// cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("comment-watch.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!(
                        "warning: failed to parse comment-watch.toml: {err}. Using defaults."
                    );
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read comment-watch.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}
