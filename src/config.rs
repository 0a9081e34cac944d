// Persisted application settings.
//
// UTF-8 JSON round-trip with an explicit two-step merge: defaults first, then
// overlay whatever keys the stored file carries. Unknown keys pass through
// untouched for forward compatibility; missing keys are backfilled; path
// settings that no longer exist on disk are reset on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTPUT_PATH: &str = "./downloads";
pub const DEFAULT_COOKIE_SOURCE: &str = "browser";
pub const DEFAULT_BROWSER: &str = "chrome";
pub const DEFAULT_QUALITY: &str = "1080p";
pub const DEFAULT_WINDOW_GEOMETRY: &str = "900x700";

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn default_cookie_source() -> String {
    DEFAULT_COOKIE_SOURCE.to_string()
}

fn default_browser() -> String {
    DEFAULT_BROWSER.to_string()
}

fn default_quality() -> String {
    DEFAULT_QUALITY.to_string()
}

fn default_window_geometry() -> String {
    DEFAULT_WINDOW_GEOMETRY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub use_cookies: bool,
    #[serde(default = "default_cookie_source")]
    pub cookie_source: String,
    #[serde(default = "default_browser")]
    pub browser_choice: String,
    #[serde(default)]
    pub cookie_file_path: String,
    #[serde(default = "default_quality")]
    pub last_quality: String,
    #[serde(default = "default_window_geometry")]
    pub window_geometry: String,
    /// Keys this version does not know about; preserved across save/load
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            use_cookies: false,
            cookie_source: default_cookie_source(),
            browser_choice: default_browser(),
            cookie_file_path: String::new(),
            last_quality: default_quality(),
            window_geometry: default_window_geometry(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Reset path-valued entries that no longer exist on disk.
    fn revalidate_paths(&mut self) {
        if !self.output_path.is_empty() && !Path::new(&self.output_path).exists() {
            self.output_path = default_output_path();
        }
        if !self.cookie_file_path.is_empty() && !Path::new(&self.cookie_file_path).exists() {
            self.cookie_file_path.clear();
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    pub settings: Settings,
}

impl SettingsStore {
    /// Load settings from `path`. Never fails: a missing file yields
    /// defaults, a corrupt file yields defaults in memory while the file on
    /// disk is left untouched until the next explicit save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(mut settings) => {
                    settings.revalidate_paths();
                    settings
                }
                Err(err) => {
                    tracing::warn!("Error loading config: {}. Using defaults.", err);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        };
        Self { path, settings }
    }

    /// Write the current settings to disk as pretty-printed JSON.
    pub fn save(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }

    pub fn reset_to_defaults(&mut self) -> std::io::Result<()> {
        self.settings = Settings::default();
        self.save()
    }

    /// The configured output directory, created on demand. Falls back to the
    /// default path when the configured one cannot be created.
    pub fn ensure_output_directory(&mut self) -> PathBuf {
        let configured = PathBuf::from(&self.settings.output_path);
        if fs::create_dir_all(&configured).is_ok() {
            return configured;
        }
        tracing::warn!(
            "Error creating output directory {:?}, falling back to default",
            configured
        );
        let fallback = PathBuf::from(DEFAULT_OUTPUT_PATH);
        let _ = fs::create_dir_all(&fallback);
        self.settings.output_path = DEFAULT_OUTPUT_PATH.to_string();
        fallback
    }
}
