use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level for the EnvFilter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Per-module overrides appended to the filter, e.g. {"reqwest": "warn"}.
    #[serde(default)]
    pub module_levels: HashMap<String, String>,
    /// Directory for the daily-rolling log file.
    #[serde(default)]
    pub log_directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            module_levels: HashMap::new(),
            log_directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the media catalog backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Items per feed page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Distance from the end of loaded data at which the next page is fetched.
    #[serde(default = "default_load_threshold")]
    pub load_threshold: usize,
    /// Seconds an image must stay open full-screen to count as watched.
    #[serde(default = "default_image_dwell_secs")]
    pub image_dwell_secs: u64,
    /// Fallback playback length for videos, in seconds. The backend does not
    /// report durations, so this bounds when a video counts as watched.
    #[serde(default = "default_video_length_secs")]
    pub video_length_secs: u64,
    /// Visible quiz countdown, in seconds.
    #[serde(default = "default_quiz_duration_secs")]
    pub quiz_duration_secs: u32,
    /// Override for the persisted session file location.
    #[serde(default)]
    pub session_file: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:80/api/v1".to_string()
}

fn default_per_page() -> u32 {
    20
}

fn default_load_threshold() -> usize {
    5
}

fn default_image_dwell_secs() -> u64 {
    5
}

fn default_video_length_secs() -> u64 {
    30
}

fn default_quiz_duration_secs() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            per_page: default_per_page(),
            load_threshold: default_load_threshold(),
            image_dwell_secs: default_image_dwell_secs(),
            video_length_secs: default_video_length_secs(),
            quiz_duration_secs: default_quiz_duration_secs(),
            session_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `config.ron` from the working directory or next to the
    /// executable; fall back to defaults when absent or unparsable.
    pub fn load() -> Self {
        let mut candidates = Vec::new();
        candidates.push(PathBuf::from("config.ron"));

        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.ron"));
            }
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                match ron::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse config at {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Self::default()
    }
}
