#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tidy_lib::{
    Database, InstallerDatabase, MemoryPreferences, Organizer, Preferences, Result,
    SqliteDatabase,
};

/// A temporary inbox plus an organizer over an in-memory store.
pub struct TestInbox {
    pub temp_dir: TempDir,
}

impl TestInbox {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn touch(&self, name: &str) -> PathBuf {
        touch(self.path(), name)
    }

    pub fn organizer(&self, prefs: Preferences) -> Result<Organizer<SqliteDatabase>> {
        let mut db = SqliteDatabase::open_in_memory()?;
        db.initialize()?;
        Organizer::new(db, self.path(), Box::new(MemoryPreferences::new(prefs)))
    }
}

pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).expect("create test file");
    path
}

pub fn enabled() -> Preferences {
    Preferences {
        enabled: true,
        ..Preferences::default()
    }
}

/// Pretends the installer at `path` was first seen `days` ago.
pub fn backdate_installer(db: &mut SqliteDatabase, path: &Path, days: i64) -> Result<()> {
    if let Some(mut entry) = db.get_installer(path)? {
        entry.first_seen = Utc::now() - Duration::days(days);
        db.upsert_installer(&entry)?;
    }
    Ok(())
}
