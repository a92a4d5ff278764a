use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::presence::{SQUARE_APP_ID, WIDESCREEN_APP_ID};

const SETTINGS_FILE: &str = "settings.json";
const SETTINGS_DIR: &str = "plex-rich-presence";
const SETTINGS_ENV: &str = "PLEX_PRESENCE_SETTINGS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_plex_url")]
    pub plex_url: String,
    #[serde(default)]
    pub plex_token: String,
    /// How long uploaded artwork stays hosted (litterbox: 1h, 12h, 24h or 72h)
    #[serde(default = "default_upload_expiry")]
    pub upload_expiry: String,
    #[serde(default)]
    pub locale_file: Option<PathBuf>,
    #[serde(default = "default_widescreen_app_id")]
    pub widescreen_app_id: i64,
    #[serde(default = "default_square_app_id")]
    pub square_app_id: i64,
}

fn default_plex_url() -> String {
    "http://127.0.0.1:32400".to_string()
}

fn default_upload_expiry() -> String {
    "1h".to_string()
}

fn default_widescreen_app_id() -> i64 {
    WIDESCREEN_APP_ID
}

fn default_square_app_id() -> i64 {
    SQUARE_APP_ID
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            plex_url: default_plex_url(),
            plex_token: String::new(),
            upload_expiry: default_upload_expiry(),
            locale_file: None,
            widescreen_app_id: WIDESCREEN_APP_ID,
            square_app_id: SQUARE_APP_ID,
        }
    }
}

pub fn get_settings_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var(SETTINGS_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| "Failed to get config directory".to_string())?
        .join(SETTINGS_DIR);

    fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;

    Ok(config_dir.join(SETTINGS_FILE))
}

pub fn load_settings() -> Result<AppSettings, String> {
    let path = get_settings_path()?;
    load_settings_from(&path)
}

pub fn load_settings_from(path: &Path) -> Result<AppSettings, String> {
    tracing::debug!("Loading settings from {}", path.display());

    if !path.exists() {
        let settings = AppSettings::default();
        if let Err(e) = save_settings_to(path, &settings) {
            tracing::warn!("Failed to write default settings: {}", e);
        }
        return Ok(settings);
    }

    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read settings file, using defaults: {}", e);
            return Ok(AppSettings::default());
        }
    };

    if contents.trim().is_empty() {
        tracing::warn!("Settings file is empty, using defaults");
        return Ok(AppSettings::default());
    }

    match serde_json::from_str(&contents) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!("Failed to parse settings file, using defaults: {}", e);
            Ok(AppSettings::default())
        }
    }
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), String> {
    tracing::debug!("Saving settings");

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    fs::write(path, contents).map_err(|e| format!("Failed to write settings file: {}", e))
}
