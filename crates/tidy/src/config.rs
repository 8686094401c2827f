use crate::error::{Result, TidyError};
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

pub struct Config {
    pub db_path: PathBuf,
    /// Held by the process that currently owns the inbox.
    pub lock_path: PathBuf,
    /// Control socket served by a running watcher.
    pub socket_path: PathBuf,
    pub prefs_path: PathBuf,
    pub categories_path: Option<PathBuf>,
    pub inbox: PathBuf,
}

impl Config {
    pub fn new(
        db_override: Option<PathBuf>,
        prefs_override: Option<PathBuf>,
        inbox_override: Option<PathBuf>,
    ) -> Result<Self> {
        let db_path = if let Some(path) = db_override {
            path
        } else if let Ok(env_path) = std::env::var("TIDY_DB") {
            PathBuf::from(env_path)
        } else {
            let xdg = BaseDirectories::with_prefix("tidy")
                .map_err(|e| TidyError::Config(format!("Failed to initialize XDG directories: {}", e)))?;
            xdg.place_data_file("tidy.db")
                .map_err(|e| TidyError::Config(format!("Failed to create data directory: {}", e)))?
        };

        let prefs_path = if let Some(path) = prefs_override {
            path
        } else if let Ok(env_path) = std::env::var("TIDY_PREFS") {
            PathBuf::from(env_path)
        } else {
            let xdg = BaseDirectories::with_prefix("tidy")
                .map_err(|e| TidyError::Config(format!("Failed to initialize XDG directories: {}", e)))?;
            xdg.place_config_file("preferences.toml")
                .map_err(|e| TidyError::Config(format!("Failed to create config directory: {}", e)))?
        };

        let categories_path = BaseDirectories::with_prefix("tidy")
            .ok()
            .and_then(|xdg| xdg.find_config_file("categories.toml"));

        let inbox = if let Some(path) = inbox_override {
            expand_tilde(&path.to_string_lossy())
        } else if let Ok(env_path) = std::env::var("TIDY_INBOX") {
            expand_tilde(&env_path)
        } else {
            home_dir()?.join("Downloads")
        };

        Ok(Self {
            lock_path: sibling_with_suffix(&db_path, "lock"),
            socket_path: sibling_with_suffix(&db_path, "sock"),
            db_path,
            prefs_path,
            categories_path,
            inbox,
        })
    }

    pub fn ensure_db_directory(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// `/data/tidy.db` becomes `/data/tidy.db.<suffix>`.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| TidyError::Config("HOME is not set".to_string()))
}

/// Expands a leading `~` to `$HOME`. Paths without one are returned as-is.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Home folders that commonly need an explicit grant before the organizer may
/// create or write into them.
pub fn is_protected_home_folder(path: &Path) -> bool {
    let Ok(home) = home_dir() else {
        return false;
    };
    ["Documents", "Pictures", "Movies", "Music"]
        .iter()
        .any(|name| path.starts_with(home.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_with_overrides() {
        let db = PathBuf::from("/tmp/test.db");
        let prefs = PathBuf::from("/tmp/prefs.toml");
        let inbox = PathBuf::from("/tmp/inbox");
        let config = Config::new(Some(db.clone()), Some(prefs.clone()), Some(inbox.clone())).unwrap();
        assert_eq!(config.db_path, db);
        assert_eq!(config.prefs_path, prefs);
        assert_eq!(config.inbox, inbox);
        assert_eq!(config.lock_path, PathBuf::from("/tmp/test.db.lock"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/test.db.sock"));
    }

    #[test]
    fn test_config_ensure_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("subdir/test.db");
        let config = Config::new(
            Some(db_path.clone()),
            Some(temp_dir.path().join("prefs.toml")),
            Some(temp_dir.path().to_path_buf()),
        )
        .unwrap();
        config.ensure_db_directory().unwrap();
        assert!(db_path.parent().unwrap().exists());
    }

    #[test]
    fn test_expand_tilde() {
        let home = home_dir().unwrap();
        assert_eq!(expand_tilde("~/Downloads/Misc"), home.join("Downloads/Misc"));
        assert_eq!(expand_tilde("/srv/files"), PathBuf::from("/srv/files"));
        assert_eq!(expand_tilde("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_protected_home_folders() {
        let home = home_dir().unwrap();
        assert!(is_protected_home_folder(&home.join("Documents/Inbox")));
        assert!(!is_protected_home_folder(&home.join("Downloads/Documents")));
    }
}
