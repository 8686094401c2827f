use crate::classify::{Category, InstallerKind};
use crate::db::{
    file_name_of, ActivityDatabase, ActivityEntry, InstallerDatabase, InstallerEntry, LogAction,
    RegistryDatabase,
};
use crate::error::Result;
use crate::registry::FileRegistry;
use chrono::{Duration, Utc};
use std::path::Path;

/// Which lifecycle signal flipped an installer to used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSignal {
    Mounted,
    Launched,
}

impl UsageSignal {
    fn action(&self) -> LogAction {
        match self {
            UsageSignal::Mounted => LogAction::Mounted,
            UsageSignal::Launched => LogAction::Launched,
        }
    }

    fn details(&self) -> &'static str {
        match self {
            UsageSignal::Mounted => "Disk image mounted",
            UsageSignal::Launched => "App launched",
        }
    }
}

pub struct InstallerLifecycleTracker<'a, D>
where
    D: InstallerDatabase + RegistryDatabase + ActivityDatabase + ?Sized,
{
    db: &'a mut D,
}

impl<'a, D> InstallerLifecycleTracker<'a, D>
where
    D: InstallerDatabase + RegistryDatabase + ActivityDatabase + ?Sized,
{
    pub fn new(db: &'a mut D) -> Self {
        Self { db }
    }

    /// Starts (or restarts) tracking an installer as unused.
    pub fn track(&mut self, path: &Path, name: &str, kind: InstallerKind) -> Result<InstallerEntry> {
        let entry = InstallerEntry {
            path: path.to_path_buf(),
            name: name.to_string(),
            kind,
            first_seen: Utc::now(),
            used: false,
            used_at: None,
        };
        self.db.upsert_installer(&entry)?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        FileRegistry::new(&mut *self.db).record_tracked(path, &extension)?;

        self.db.append_log(
            &ActivityEntry::new(name, Category::Installer, LogAction::Tracked, path)
                .with_details("Installer tracked for monitoring"),
        )?;
        log::info!("Tracking installer {} ({})", name, kind.as_str());

        Ok(entry)
    }

    /// Flips the entry at `path` to used. No-op for unknown or already used
    /// paths; returns whether anything changed.
    pub fn mark_used(&mut self, path: &Path, signal: UsageSignal) -> Result<bool> {
        let Some(entry) = self.db.get_installer(path)? else {
            return Ok(false);
        };

        let flipped = self.db.mark_installer_used(path, Utc::now())?;
        if flipped {
            self.db.append_log(
                &ActivityEntry::new(&entry.name, Category::Installer, signal.action(), path)
                    .with_details(signal.details()),
            )?;
            log::info!("Installer {} used ({:?})", entry.name, signal);
        }

        Ok(flipped)
    }

    /// Unused disk images whose path equals the mounted image path.
    pub fn match_mount(&self, image_path: &Path) -> Result<Vec<InstallerEntry>> {
        Ok(self
            .db
            .list_installers()?
            .into_iter()
            .filter(|e| e.kind == InstallerKind::DiskImage && !e.used && e.path == image_path)
            .collect())
    }

    /// Unused application bundles with the same file name as the launched
    /// bundle.
    pub fn match_launch(&self, bundle_path: &Path) -> Result<Vec<InstallerEntry>> {
        let bundle_name = file_name_of(bundle_path);
        Ok(self
            .db
            .list_installers()?
            .into_iter()
            .filter(|e| e.kind == InstallerKind::Application && !e.used && e.name == bundle_name)
            .collect())
    }

    /// Unused entries first seen more than `older_than_days` ago. Read only.
    pub fn sweep_unused(&self, older_than_days: u32) -> Result<Vec<InstallerEntry>> {
        let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
        self.db.unused_installers_before(cutoff)
    }

    pub fn list(&self) -> Result<Vec<InstallerEntry>> {
        self.db.list_installers()
    }

    pub fn forget(&mut self, path: &Path) -> Result<bool> {
        self.db.remove_installer(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ActivityFilter, Database, RecordState, SqliteDatabase};
    use std::path::PathBuf;

    fn create_test_db() -> SqliteDatabase {
        let mut db = SqliteDatabase::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_track_writes_entry_record_and_log() {
        let mut db = create_test_db();
        let path = Path::new("/inbox/App.dmg");

        InstallerLifecycleTracker::new(&mut db)
            .track(path, "App.dmg", InstallerKind::DiskImage)
            .unwrap();

        assert!(db.get_installer(path).unwrap().is_some());
        assert_eq!(db.get_record(path).unwrap().unwrap().state, RecordState::Tracked);
        let log = db.query_log(&ActivityFilter::default()).unwrap();
        assert_eq!(log[0].action, LogAction::Tracked);
    }

    #[test]
    fn test_mark_used_flips_once() {
        let mut db = create_test_db();
        let path = Path::new("/inbox/App.dmg");

        let mut tracker = InstallerLifecycleTracker::new(&mut db);
        tracker.track(path, "App.dmg", InstallerKind::DiskImage).unwrap();
        assert!(tracker.mark_used(path, UsageSignal::Mounted).unwrap());
        assert!(!tracker.mark_used(path, UsageSignal::Mounted).unwrap());
        assert!(!tracker.mark_used(Path::new("/inbox/Other.dmg"), UsageSignal::Mounted).unwrap());

        let mounted = db
            .query_log(&ActivityFilter {
                action: Some(LogAction::Mounted),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mounted.len(), 1);
    }

    #[test]
    fn test_signal_correlation() {
        let mut db = create_test_db();

        let mut tracker = InstallerLifecycleTracker::new(&mut db);
        tracker
            .track(Path::new("/inbox/Tool.dmg"), "Tool.dmg", InstallerKind::DiskImage)
            .unwrap();
        tracker
            .track(Path::new("/inbox/Editor.app"), "Editor.app", InstallerKind::Application)
            .unwrap();

        let mounted = tracker.match_mount(Path::new("/inbox/Tool.dmg")).unwrap();
        assert_eq!(mounted.len(), 1);
        assert!(tracker.match_mount(Path::new("/inbox/Editor.app")).unwrap().is_empty());

        let launched = tracker
            .match_launch(Path::new("/opt/apps/Editor.app"))
            .unwrap();
        assert_eq!(launched[0].path, PathBuf::from("/inbox/Editor.app"));
        assert!(tracker.match_launch(Path::new("/opt/Tool.dmg")).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_unused_by_age() {
        let mut db = create_test_db();
        for (name, days) in [("old.dmg", 8), ("fresh.dmg", 6)] {
            db.upsert_installer(&InstallerEntry {
                path: PathBuf::from(format!("/inbox/{}", name)),
                name: name.to_string(),
                kind: InstallerKind::DiskImage,
                first_seen: Utc::now() - Duration::days(days),
                used: false,
                used_at: None,
            })
            .unwrap();
        }

        let tracker = InstallerLifecycleTracker::new(&mut db);
        let stale = tracker.sweep_unused(7).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].name, "old.dmg");
    }
}
