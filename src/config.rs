use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub log_level: Option<String>,
    /// Card size in terminal cells.
    pub card_width: u16,
    pub card_height: u16,
    pub double_click_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: None,
            card_width: 24,
            card_height: 6,
            double_click_ms: 400,
        }
    }
}

impl Settings {
    /// Reads the user settings file; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Settings::load_from(&path),
            None => Ok(Settings::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(Settings::default());
        }
        let mut settings: Settings =
            serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
        settings.card_width = settings.card_width.max(4);
        settings.card_height = settings.card_height.max(3);
        Ok(settings)
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pinboard").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn log_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pinboard").context("locating data directory")?;
    Ok(dirs.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "log_level: warn\ncard_width: 1\n").unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("warn"));
        assert_eq!(settings.card_width, 4);
        assert_eq!(settings.card_height, Settings::default().card_height);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "card_width: [nope").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
