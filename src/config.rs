use anyhow::{anyhow, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::store::DEFAULT_STORAGE_KEY;
use crate::tracker::Settings;

pub const APP_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
pub const HOME_ENV: &str = "JOBTRACK_HOME";

const CONFIG_FILE: &str = "config.toml";
const STORAGE_FILE: &str = "storage.db";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

impl AppConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            allow_future_dates: self.general.allow_future_dates,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeneralConfig {
    /// Storage key holding the serialized applications.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub allow_future_dates: bool,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            allow_future_dates: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub foreground: Color,
    pub border_active: Color,
    pub border_inactive: Color,
    pub header: Color,
    pub sort_indicator: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub checked_row_bg: Color,
    pub field_error: Color,
    pub notice_info: Color,
    pub notice_warning: Color,
    pub notice_error: Color,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            foreground: Color::Rgb(248, 248, 242),
            border_active: Color::Rgb(255, 121, 198),
            border_inactive: Color::Rgb(98, 114, 164),
            header: Color::Rgb(189, 147, 249),
            sort_indicator: Color::Rgb(139, 233, 253),
            selection_bg: Color::Rgb(68, 71, 90),
            selection_fg: Color::Rgb(255, 121, 198),
            checked_row_bg: Color::Rgb(40, 60, 110),
            field_error: Color::Rgb(255, 85, 85),
            notice_info: Color::Rgb(80, 250, 123),
            notice_warning: Color::Rgb(255, 184, 108),
            notice_error: Color::Rgb(255, 85, 85),
        }
    }
}

/// `$JOBTRACK_HOME`, or `~/.jobtrack`.
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let mut path = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    path.push(".jobtrack");
    Ok(path)
}

pub fn storage_path(app_dir: &Path) -> PathBuf {
    app_dir.join(STORAGE_FILE)
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())
}

/// Reads `config.toml`, writing the defaults on first run. A file that does not
/// parse is moved aside to `config.toml.bak`.
pub fn load_config(app_dir: &Path) -> AppConfig {
    fs::create_dir_all(app_dir).ok();
    let path = app_dir.join(CONFIG_FILE);

    if !path.exists() {
        let default_config = AppConfig::default();
        if let Ok(toml_str) = toml::to_string_pretty(&default_config) {
            let _ = write_private(&path, &toml_str);
        }
        return default_config;
    }

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to parse config.toml: {}.", e);
                let backup_path = path.with_extension("toml.bak");
                if let Err(backup_err) = fs::rename(&path, &backup_path) {
                    eprintln!("Failed to backup corrupted config: {}", backup_err);
                } else {
                    eprintln!("Corrupted config backed up to {:?}", backup_path);
                }
                eprintln!("Using default configuration.");
                AppConfig::default()
            }
        },
        Err(e) => {
            eprintln!("Failed to read config file: {}. Using default.", e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.general.storage_key, "form-data");
        assert!(!config.general.allow_future_dates);
        assert!(dir.path().join("config.toml").exists());

        // The written file reads back to the same config.
        assert_eq!(load_config(dir.path()), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[general]\nallow_future_dates = true\n",
        )
        .unwrap();

        let config = load_config(dir.path());
        assert!(config.general.allow_future_dates);
        assert_eq!(config.general.storage_key, "form-data");
        assert_eq!(config.theme, ThemeConfig::default());
        assert!(config.settings().allow_future_dates);
    }

    #[test]
    fn corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "[general\nstorage_key = ").unwrap();

        let config = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(dir.path().join("config.toml.bak").exists());
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn custom_storage_key_and_colors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[general]\nstorage_key = \"jobs\"\n\n[theme]\nheader = \"Yellow\"\n",
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.general.storage_key, "jobs");
        assert_eq!(config.theme.header, Color::Yellow);
        assert_eq!(config.theme.field_error, ThemeConfig::default().field_error);
    }

    #[test]
    fn storage_lives_in_app_dir() {
        let dir = Path::new("/tmp/jobtrack-home");
        assert_eq!(storage_path(dir), dir.join("storage.db"));
    }
}
