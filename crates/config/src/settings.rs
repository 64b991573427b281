// Application settings
// Loaded from <config_dir>/tunebook/settings.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Library index database. A relative path resolves against the
    /// config directory.
    pub database: PathBuf,

    /// Source code assumed when a command omits `--source`.
    pub default_source: Option<String>,

    /// Width of the banner rules in text reports.
    pub report_width: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("library.db"),
            default_source: None,
            report_width: 80,
        }
    }
}

impl Settings {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunebook")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("error parsing {}: {e}", path.display());
                    eprintln!("using default settings");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save settings, creating the config directory if needed.
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, contents).map_err(|e| e.to_string())
    }

    /// Absolute path of the library database.
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            Self::config_dir().join(&self.database)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_absent() {
        let settings = Settings::load_from(Path::new("/nonexistent/settings.toml"));
        assert_eq!(settings.database, PathBuf::from("library.db"));
        assert_eq!(settings.report_width, 80);
        assert!(settings.default_source.is_none());
    }

    #[test]
    fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = Settings {
            database: PathBuf::from("/data/library.db"),
            default_source: Some("Asp".into()),
            report_width: 100,
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.database, PathBuf::from("/data/library.db"));
        assert_eq!(loaded.default_source.as_deref(), Some("Asp"));
        assert_eq!(loaded.report_width, 100);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "database = [not toml").unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.report_width, 80);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "report_width = 120\n").unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.report_width, 120);
        assert_eq!(settings.database, PathBuf::from("library.db"));
    }

    #[test]
    fn absolute_database_path_unchanged() {
        let settings = Settings {
            database: PathBuf::from("/data/library.db"),
            ..Settings::default()
        };
        assert_eq!(settings.database_path(), PathBuf::from("/data/library.db"));
    }
}
