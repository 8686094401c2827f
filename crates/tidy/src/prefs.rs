//! User preferences and the store they are read from.
//!
//! The organizer reads preferences at every decision point instead of caching
//! them, so edits made by another process (or the `config` subcommand) take
//! effect on the next scan.

use crate::classify::Category;
use crate::config::expand_tilde;
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub enabled: bool,
    pub clean_installers_immediately: bool,
    pub clean_after_first_use: bool,
    pub auto_clean_unused_installers: bool,
    pub auto_clean_days: u32,
    pub confirm_before_moving: bool,
    /// Per-category destination overrides, keyed by [`Category::as_str`].
    pub destinations: BTreeMap<String, String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enabled: false,
            clean_installers_immediately: false,
            clean_after_first_use: true,
            auto_clean_unused_installers: true,
            auto_clean_days: 7,
            confirm_before_moving: false,
            destinations: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Override if one is set, otherwise `<inbox>/<default folder>`.
    pub fn destination_for(&self, category: Category, inbox: &Path) -> PathBuf {
        match self.destinations.get(category.as_str()) {
            Some(custom) => expand_tilde(custom),
            None => inbox.join(category.default_folder()),
        }
    }

    pub fn set_destination(&mut self, category: Category, path: &str) {
        self.destinations
            .insert(category.as_str().to_string(), path.to_string());
    }

    pub fn reset_destination(&mut self, category: Category) {
        self.destinations.remove(category.as_str());
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Applies a `key = value` edit from the command line.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "enabled" => self.enabled = parse_bool(key, value)?,
            "clean_installers_immediately" => {
                self.clean_installers_immediately = parse_bool(key, value)?
            }
            "clean_after_first_use" => self.clean_after_first_use = parse_bool(key, value)?,
            "auto_clean_unused_installers" => {
                self.auto_clean_unused_installers = parse_bool(key, value)?
            }
            "confirm_before_moving" => self.confirm_before_moving = parse_bool(key, value)?,
            "auto_clean_days" => {
                self.auto_clean_days = value.trim().parse().map_err(|_| {
                    TidyError::Config(format!("Invalid value for {}: {}", key, value))
                })?
            }
            _ => return Err(TidyError::Config(format!("Unknown preference: {}", key))),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(TidyError::Config(format!(
            "Invalid value for {}: {} (expected true/false)",
            key, value
        ))),
    }
}

/// Key-value configuration provider consumed by the organizer.
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<Preferences>;
    fn save(&self, prefs: &Preferences) -> Result<()>;
}

/// Preferences kept in a TOML file. A missing file reads as defaults.
pub struct TomlPreferences {
    path: PathBuf,
}

impl TomlPreferences {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for TomlPreferences {
    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        toml::from_str(&contents)
            .map_err(|e| TidyError::Config(format!("Failed to parse preferences: {}", e)))
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let contents = toml::to_string_pretty(prefs)
            .map_err(|e| TidyError::Config(format!("Failed to serialize preferences: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferences {
    inner: Mutex<Preferences>,
}

impl MemoryPreferences {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn load(&self) -> Result<Preferences> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| TidyError::Config("Preference lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| TidyError::Config("Preference lock poisoned".to_string()))?;
        *guard = prefs.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_first_run() {
        let prefs = Preferences::default();
        assert!(!prefs.enabled);
        assert!(!prefs.clean_installers_immediately);
        assert!(prefs.clean_after_first_use);
        assert!(prefs.auto_clean_unused_installers);
        assert_eq!(prefs.auto_clean_days, 7);
        assert!(!prefs.confirm_before_moving);
    }

    #[test]
    fn test_destination_override() {
        let inbox = Path::new("/home/me/Downloads");
        let mut prefs = Preferences::default();
        assert_eq!(
            prefs.destination_for(Category::Installer, inbox),
            inbox.join("Junk Installers")
        );

        prefs.set_destination(Category::Image, "/srv/photos");
        assert_eq!(
            prefs.destination_for(Category::Image, inbox),
            PathBuf::from("/srv/photos")
        );

        prefs.reset_destination(Category::Image);
        assert_eq!(prefs.destination_for(Category::Image, inbox), inbox.join("Images"));
    }

    #[test]
    fn test_toml_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = TomlPreferences::new(temp_dir.path().join("nested/preferences.toml"));

        assert_eq!(store.load().unwrap(), Preferences::default());

        let mut prefs = Preferences::default();
        prefs.confirm_before_moving = true;
        prefs.auto_clean_days = 14;
        prefs.set_destination(Category::Music, "~/Audio");
        store.save(&prefs).unwrap();

        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("preferences.toml");
        fs::write(&path, "enabled = true\n").unwrap();

        let prefs = TomlPreferences::new(&path).load().unwrap();
        assert!(prefs.enabled);
        assert_eq!(prefs.auto_clean_days, 7);
        assert!(prefs.clean_after_first_use);
    }

    #[test]
    fn test_set_value() {
        let mut prefs = Preferences::default();
        prefs.set_value("confirm_before_moving", "yes").unwrap();
        prefs.set_value("auto_clean_days", "3").unwrap();
        assert!(prefs.confirm_before_moving);
        assert_eq!(prefs.auto_clean_days, 3);

        assert!(prefs.set_value("auto_clean_days", "soon").is_err());
        assert!(prefs.set_value("colour", "blue").is_err());
    }
}
