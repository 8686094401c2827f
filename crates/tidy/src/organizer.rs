//! The organizer service.
//!
//! One `Organizer` owns the store and every collaborator for a single inbox.
//! All of its operations are synchronous and expect to be called from one
//! thread at a time; the watcher lane provides that serialization when
//! several triggers are live.

use crate::access::{with_access, AccessGate, FsAccess};
use crate::alerts::{LogNotifier, Notifier};
use crate::classify::{Category, Classifier, InstallerKind};
use crate::config::is_protected_home_folder;
use crate::confirm::{ConfirmationSource, Decision, FixedDecision};
use crate::db::{
    ActivityEntry, FileRecord, InstallerEntry, LogAction, RecordFilter, RecordState, Store,
};
use crate::error::{Result, TidyError};
use crate::index::{InboxEntry, InboxScanner, ScanOptions};
use crate::installer::{InstallerLifecycleTracker, UsageSignal};
use crate::migrate::engine::SYSTEM_FOLDER_HINT;
use crate::migrate::{MoveEngine, RollbackEngine};
use crate::prefs::{PreferenceStore, Preferences};
use crate::registry::FileRegistry;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Window used by "recent moves" in status and `revert --recent`.
pub const RECENT_WINDOW_MINUTES: i64 = 30;

/// Counters for one batch operation. Failures are counted, never fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub moved: usize,
    pub tracked: usize,
    pub pending: usize,
    pub reverted: usize,
    pub cleaned: usize,
    pub used: usize,
    pub missing: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Point-in-time view for observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub monitoring: bool,
    pub enabled: bool,
    pub pending: usize,
    pub recent_moves: usize,
    pub total_moved: usize,
    pub tracked_installers: usize,
    pub last_error: Option<String>,
}

pub struct Organizer<D: Store> {
    db: D,
    inbox: PathBuf,
    classifier: Classifier,
    categories_path: Option<PathBuf>,
    scanner: InboxScanner,
    prefs: Box<dyn PreferenceStore>,
    access: Box<dyn AccessGate>,
    confirm: Box<dyn ConfirmationSource>,
    notifier: Box<dyn Notifier>,
    monitoring: bool,
    last_error: Option<String>,
}

impl<D: Store> Organizer<D> {
    /// Builds an organizer with filesystem access, no confirmation prompts
    /// and log-only notifications. Swap collaborators with the `with_*`
    /// methods.
    pub fn new<P: Into<PathBuf>>(db: D, inbox: P, prefs: Box<dyn PreferenceStore>) -> Result<Self> {
        Ok(Self {
            db,
            inbox: inbox.into(),
            classifier: Classifier::default(),
            categories_path: None,
            scanner: InboxScanner::new()?,
            prefs,
            access: Box::new(FsAccess),
            confirm: Box::new(FixedDecision(Decision::Proceed)),
            notifier: Box::new(LogNotifier),
            monitoring: false,
            last_error: None,
        })
    }

    /// Loads the extension table from `path` now and on every reload.
    pub fn with_categories_file(mut self, path: Option<PathBuf>) -> Result<Self> {
        self.classifier = Classifier::load(path.as_deref())?;
        self.categories_path = path;
        Ok(self)
    }

    pub fn with_access(mut self, access: Box<dyn AccessGate>) -> Self {
        self.access = access;
        self
    }

    pub fn with_confirmation(mut self, confirm: Box<dyn ConfirmationSource>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut D {
        &mut self.db
    }

    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn preferences(&self) -> Result<Preferences> {
        self.prefs.load()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_monitoring(&mut self, monitoring: bool) {
        self.monitoring = monitoring;
    }

    /// Creates every category destination that does not exist yet. Returns
    /// the number of folders that could not be created.
    pub fn prepare_destinations(&mut self) -> Result<usize> {
        let prefs = self.prefs.load()?;
        let mut failures = 0;

        for category in Category::ALL {
            let dir = prefs.destination_for(category, &self.inbox);
            if dir.is_dir() {
                continue;
            }

            let created = with_access(self.access.as_ref(), &dir, || fs::create_dir_all(&dir));
            match created {
                Ok(()) => log::info!("Created destination folder {}", dir.display()),
                Err(e) => {
                    failures += 1;
                    log::error!("Failed to create {}: {}", dir.display(), e);

                    let (name, details) = if is_protected_home_folder(&dir) {
                        ("System Folder Access".to_string(), SYSTEM_FOLDER_HINT.to_string())
                    } else {
                        (category.display_name().to_string(), e.to_string())
                    };
                    self.db.append_log(
                        &ActivityEntry::new(&name, category, LogAction::Error, &dir)
                            .with_details(details),
                    )?;
                    self.last_error = Some(format!(
                        "Destination unavailable: {}",
                        dir.display()
                    ));
                }
            }
        }

        Ok(failures)
    }

    /// Organizes files that have never been seen before. Does nothing while
    /// organizing is disabled in preferences.
    pub fn detect_new_files(&mut self) -> Result<BatchOutcome> {
        let prefs = self.prefs.load()?;
        let mut outcome = BatchOutcome::default();

        if !prefs.enabled {
            log::debug!("Organizing is disabled, ignoring new files");
            return Ok(outcome);
        }

        for entry in self.list_inbox(false)? {
            if FileRegistry::new(&mut self.db).get(&entry.path)?.is_some() {
                continue;
            }
            self.process_entry(&entry, &prefs, &mut outcome);
        }

        log::debug!("New-file scan: {:?}", outcome);
        Ok(outcome)
    }

    /// Marks every file without a pending, moved or tracked record as
    /// pending. Never moves anything.
    pub fn detect_pending_files(&mut self) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for entry in self.list_inbox(false)? {
            let category = self.classifier.classify(&entry.extension);
            let recorded = FileRegistry::new(&mut self.db).record_pending(
                &entry.path,
                &entry.extension,
                category,
            );
            match recorded {
                Ok(true) => outcome.pending += 1,
                Ok(false) => {}
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        if outcome.pending > 0 {
            log::info!("Marked {} file(s) as pending", outcome.pending);
        }
        Ok(outcome)
    }

    /// Classifies and organizes every file in the inbox right away, newest
    /// first. Installers that are already tracked are left alone.
    pub fn scan_now(&mut self) -> Result<BatchOutcome> {
        let prefs = self.prefs.load()?;
        let mut outcome = BatchOutcome::default();

        for entry in self.list_inbox(true)? {
            let existing = FileRegistry::new(&mut self.db).get(&entry.path)?;
            if existing.map(|r| r.state) == Some(RecordState::Tracked) {
                continue;
            }
            self.process_entry(&entry, &prefs, &mut outcome);
        }

        log::info!(
            "Scan finished: {} moved, {} tracked, {} failed",
            outcome.moved,
            outcome.tracked,
            outcome.failed
        );
        Ok(outcome)
    }

    /// Moves one pending file without asking for confirmation.
    pub fn organize_file(&mut self, path: &Path) -> Result<PathBuf> {
        let record = FileRegistry::new(&mut self.db)
            .get(path)?
            .ok_or_else(|| TidyError::RecordNotFound(path.display().to_string()))?;

        if record.state != RecordState::Pending {
            return Err(TidyError::InvalidStateTransition {
                from: record.state.as_str().to_string(),
                to: RecordState::Moved.as_str().to_string(),
            });
        }

        let category = self.classifier.classify(&record.extension);
        let result = MoveEngine::new(
            &mut self.db,
            self.prefs.as_ref(),
            &self.inbox,
            self.access.as_ref(),
            self.notifier.as_ref(),
        )
        .move_with_details(path, category, Some("Manually organized"));

        if let Err(e) = &result {
            if !e.is_silent() {
                self.last_error = Some(e.to_string());
            }
        }
        result
    }

    pub fn organize_all_pending(&mut self) -> Result<BatchOutcome> {
        let pending = FileRegistry::new(&mut self.db)
            .query(&RecordFilter::state(RecordState::Pending))?;
        let mut outcome = BatchOutcome::default();

        log::info!("Organizing {} pending file(s)", pending.len());
        for record in pending {
            match self.organize_file(&record.path) {
                Ok(_) => outcome.moved += 1,
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        Ok(outcome)
    }

    /// Reverts the move recorded by activity log entry `log_id`, either a
    /// regular move or an installer cleanup.
    pub fn revert(&mut self, log_id: i64) -> Result<PathBuf> {
        let entry = self
            .db
            .get_log(log_id)?
            .ok_or_else(|| TidyError::RecordNotFound(format!("log entry {}", log_id)))?;

        if !matches!(entry.action, LogAction::Moved | LogAction::Cleaned) {
            return Err(TidyError::InvalidStateTransition {
                from: entry.action.as_str().to_string(),
                to: LogAction::Reverted.as_str().to_string(),
            });
        }

        let source = PathBuf::from(&entry.source_path);
        let record = FileRegistry::new(&mut self.db)
            .get(&source)?
            .ok_or_else(|| TidyError::RecordNotFound(entry.source_path.clone()))?;

        self.revert_record(&record)
    }

    pub fn revert_recent(&mut self, minutes: i64) -> Result<BatchOutcome> {
        let since = Utc::now() - Duration::minutes(minutes);
        self.revert_matching(&RecordFilter::any_of(&RecordState::REVERTIBLE).since(since))
    }

    pub fn revert_all(&mut self) -> Result<BatchOutcome> {
        self.revert_matching(&RecordFilter::any_of(&RecordState::REVERTIBLE))
    }

    /// Re-reads the inbox from scratch: pending markers are rebuilt and moves
    /// whose file has disappeared from the destination become errors.
    pub fn refresh(&mut self) -> Result<BatchOutcome> {
        let cleared = FileRegistry::new(&mut self.db).clear_pending()?;
        log::debug!("Cleared {} pending record(s)", cleared);

        let mut outcome = self.detect_pending_files()?;

        let moved = FileRegistry::new(&mut self.db)
            .query(&RecordFilter::state(RecordState::Moved))?;
        for record in moved {
            let present = record.destination.as_deref().is_some_and(Path::exists);
            if present {
                continue;
            }
            log::warn!("File no longer exists at destination: {}", record.file_name);
            let flagged = FileRegistry::new(&mut self.db).record_missing(&record);
            match flagged {
                Ok(_) => outcome.missing += 1,
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        Ok(outcome)
    }

    /// Moves unused installers older than the configured age out of the
    /// inbox. Entries whose file is gone are dropped.
    pub fn cleanup_sweep(&mut self) -> Result<BatchOutcome> {
        let prefs = self.prefs.load()?;
        let mut outcome = BatchOutcome::default();

        if !prefs.auto_clean_unused_installers {
            return Ok(outcome);
        }

        let days = prefs.auto_clean_days;
        let stale = InstallerLifecycleTracker::new(&mut self.db).sweep_unused(days)?;

        for entry in stale {
            if !entry.path.exists() {
                InstallerLifecycleTracker::new(&mut self.db).forget(&entry.path)?;
                FileRegistry::new(&mut self.db).forget(&entry.path)?;
                continue;
            }

            let moved = MoveEngine::new(
                &mut self.db,
                self.prefs.as_ref(),
                &self.inbox,
                self.access.as_ref(),
                self.notifier.as_ref(),
            )
            .move_file(&entry.path, Category::Installer);

            match moved {
                Ok(destination) => {
                    FileRegistry::new(&mut self.db).record_cleaned(&entry.path, &destination, days)?;
                    outcome.cleaned += 1;
                }
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        if outcome.cleaned > 0 {
            log::info!("Cleaned {} unused installer(s)", outcome.cleaned);
        }
        Ok(outcome)
    }

    /// A disk image at `image_path` was mounted.
    pub fn volume_mounted(&mut self, image_path: &Path) -> Result<BatchOutcome> {
        let matches = InstallerLifecycleTracker::new(&mut self.db).match_mount(image_path)?;
        self.installers_used(matches, UsageSignal::Mounted)
    }

    /// An application bundle at `bundle_path` was launched.
    pub fn app_launched(&mut self, bundle_path: &Path) -> Result<BatchOutcome> {
        let matches = InstallerLifecycleTracker::new(&mut self.db).match_launch(bundle_path)?;
        self.installers_used(matches, UsageSignal::Launched)
    }

    pub fn reload_categories(&mut self) -> Result<()> {
        let fresh = Classifier::load(self.categories_path.as_deref())?;
        self.classifier.reload(fresh.table().clone());
        log::info!("Reloaded extension table");
        Ok(())
    }

    pub fn installers(&self) -> Result<Vec<InstallerEntry>> {
        self.db.list_installers()
    }

    pub fn status_snapshot(&self) -> Result<StatusSnapshot> {
        let since = Utc::now() - Duration::minutes(RECENT_WINDOW_MINUTES);
        let recent = self
            .db
            .query_records(&RecordFilter::state(RecordState::Moved).since(since))?;

        Ok(StatusSnapshot {
            monitoring: self.monitoring,
            enabled: self.prefs.load()?.enabled,
            pending: self.db.count_records(RecordState::Pending)?,
            recent_moves: recent.len(),
            total_moved: self.db.count_records(RecordState::Moved)?,
            tracked_installers: self.db.list_installers()?.len(),
            last_error: self.last_error.clone(),
        })
    }

    fn list_inbox(&mut self, newest_first: bool) -> Result<Vec<InboxEntry>> {
        let options = ScanOptions { newest_first };
        match self.scanner.list(&self.inbox, &options) {
            Ok((entries, stats)) => {
                log::debug!(
                    "Inbox skips: {} hidden, {} partial, {} without extension, {} directories, {} unreadable",
                    stats.hidden_skipped,
                    stats.partial_skipped,
                    stats.no_extension_skipped,
                    stats.dirs_skipped,
                    stats.errors
                );
                Ok(entries)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn process_entry(&mut self, entry: &InboxEntry, prefs: &Preferences, outcome: &mut BatchOutcome) {
        let category = self.classifier.classify(&entry.extension);

        if category == Category::Installer {
            let kind = InstallerKind::from_extension(&entry.extension);
            let tracked = InstallerLifecycleTracker::new(&mut self.db).track(
                &entry.path,
                &entry.file_name,
                kind,
            );
            match tracked {
                Ok(_) => outcome.tracked += 1,
                Err(e) => {
                    self.note_failure(e, outcome);
                    return;
                }
            }
            if !prefs.clean_installers_immediately {
                return;
            }
        }

        let moved = MoveEngine::new(
            &mut self.db,
            self.prefs.as_ref(),
            &self.inbox,
            self.access.as_ref(),
            self.notifier.as_ref(),
        )
        .move_confirmed(&entry.path, category, self.confirm.as_ref());

        match moved {
            Ok(Some(_)) => outcome.moved += 1,
            Ok(None) => outcome.skipped += 1,
            Err(e) => self.note_failure(e, outcome),
        }
    }

    fn installers_used(
        &mut self,
        entries: Vec<InstallerEntry>,
        signal: UsageSignal,
    ) -> Result<BatchOutcome> {
        let prefs = self.prefs.load()?;
        let mut outcome = BatchOutcome::default();

        for entry in entries {
            if !InstallerLifecycleTracker::new(&mut self.db).mark_used(&entry.path, signal)? {
                continue;
            }
            outcome.used += 1;

            if !prefs.clean_after_first_use || !entry.path.exists() {
                continue;
            }

            let moved = MoveEngine::new(
                &mut self.db,
                self.prefs.as_ref(),
                &self.inbox,
                self.access.as_ref(),
                self.notifier.as_ref(),
            )
            .move_file(&entry.path, Category::Installer);

            match moved {
                Ok(_) => outcome.moved += 1,
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        Ok(outcome)
    }

    fn revert_record(&mut self, record: &FileRecord) -> Result<PathBuf> {
        let result = RollbackEngine::new(&mut self.db, self.access.as_ref()).revert(record);
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    fn revert_matching(&mut self, filter: &RecordFilter) -> Result<BatchOutcome> {
        let records = FileRegistry::new(&mut self.db).query(filter)?;
        let mut outcome = BatchOutcome::default();

        log::info!("Reverting {} moved file(s)", records.len());
        for record in records {
            match self.revert_record(&record) {
                Ok(_) => outcome.reverted += 1,
                Err(e) => self.note_failure(e, &mut outcome),
            }
        }

        Ok(outcome)
    }

    fn note_failure(&mut self, err: TidyError, outcome: &mut BatchOutcome) {
        if err.is_silent() {
            outcome.skipped += 1;
            return;
        }
        log::warn!("{}", err);
        outcome.failed += 1;
        self.last_error = Some(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        ActivityDatabase, ActivityFilter, Database, RegistryDatabase, SqliteDatabase,
    };
    use crate::prefs::MemoryPreferences;
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedNotifier(Arc<Mutex<Vec<String>>>);

    impl Notifier for SharedNotifier {
        fn notify(&self, title: &str, _body: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct CountingGate(Arc<AtomicUsize>);

    impl AccessGate for CountingGate {
        fn can_access(&self, _dir: &Path) -> bool {
            true
        }

        fn begin_access(&self, _dir: &Path) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn end_access(&self, _dir: &Path) {}
    }

    fn organizer(temp: &TempDir, prefs: Preferences) -> Organizer<SqliteDatabase> {
        let mut db = SqliteDatabase::open_in_memory().unwrap();
        db.initialize().unwrap();
        Organizer::new(db, temp.path(), Box::new(MemoryPreferences::new(prefs))).unwrap()
    }

    fn enabled() -> Preferences {
        Preferences {
            enabled: true,
            ..Preferences::default()
        }
    }

    fn touch(temp: &TempDir, name: &str) -> PathBuf {
        let path = temp.path().join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_detect_new_respects_enabled_flag() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "a.pdf");

        let mut org = organizer(&temp, Preferences::default());
        assert!(org.detect_new_files().unwrap().is_empty());
        assert!(temp.path().join("a.pdf").exists());
    }

    #[test]
    fn test_detect_new_moves_and_tracks() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "a.pdf");
        touch(&temp, "Setup.dmg");

        let mut org = organizer(&temp, enabled());
        let outcome = org.detect_new_files().unwrap();

        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.tracked, 1);
        assert!(temp.path().join("Documents/a.pdf").exists());
        assert!(temp.path().join("Setup.dmg").exists());
        assert_eq!(org.installers().unwrap().len(), 1);

        assert!(org.detect_new_files().unwrap().is_empty());
    }

    #[test]
    fn test_pending_scan_skips_tracked_installers() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "Setup.dmg");
        touch(&temp, "b.zip");

        let mut org = organizer(&temp, enabled());
        InstallerLifecycleTracker::new(org.db_mut())
            .track(&temp.path().join("Setup.dmg"), "Setup.dmg", InstallerKind::DiskImage)
            .unwrap();

        let outcome = org.detect_pending_files().unwrap();
        assert_eq!(outcome.pending, 1);
    }

    #[test]
    fn test_scan_now_counts_failures_without_aborting() {
        let temp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        touch(&temp, "a.pdf");
        touch(&temp, "b.jpg");
        touch(&temp, "c.xyz");
        let blocker = touch(&elsewhere, "blocker");

        let mut prefs = enabled();
        prefs.set_destination(Category::Document, &blocker.join("docs").to_string_lossy());
        let mut org = organizer(&temp, prefs);

        let outcome = org.scan_now().unwrap();
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.moved, 2);
        assert!(temp.path().join("a.pdf").exists());
        assert!(temp.path().join("Images/b.jpg").exists());
        assert!(temp.path().join("Misc/c.xyz").exists());
        assert!(org.last_error().is_some());
    }

    #[test]
    fn test_organize_file_requires_pending() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "a.pdf");

        let mut org = organizer(&temp, enabled());
        assert!(matches!(
            org.organize_file(&path),
            Err(TidyError::RecordNotFound(_))
        ));

        org.detect_pending_files().unwrap();
        let dest = org.organize_file(&path).unwrap();
        assert_eq!(dest, temp.path().join("Documents/a.pdf"));
        assert!(matches!(
            org.organize_file(&path),
            Err(TidyError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_revert_by_log_id() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "a.pdf");

        let mut org = organizer(&temp, enabled());
        org.scan_now().unwrap();
        let moved = org
            .db()
            .query_log(&ActivityFilter {
                action: Some(LogAction::Moved),
                ..Default::default()
            })
            .unwrap();

        let restored = org.revert(moved[0].id).unwrap();
        assert_eq!(restored, path);
        assert!(path.exists());

        let reverted_id = org.db().query_log(&ActivityFilter::default()).unwrap()[0].id;
        assert!(matches!(
            org.revert(reverted_id),
            Err(TidyError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_reverted_file_is_not_moved_again_by_new_file_scan() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "a.pdf");

        let mut org = organizer(&temp, enabled());
        org.scan_now().unwrap();
        assert_eq!(org.revert_all().unwrap().reverted, 1);

        assert!(org.detect_new_files().unwrap().is_empty());
        assert!(path.exists());
        assert_eq!(org.detect_pending_files().unwrap().pending, 1);
    }

    #[test]
    fn test_refresh_flags_missing_destinations() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "a.pdf");
        touch(&temp, "b.png");

        let mut org = organizer(&temp, enabled());
        org.scan_now().unwrap();
        fs::remove_file(temp.path().join("Documents/a.pdf")).unwrap();
        touch(&temp, "c.txt");

        let outcome = org.refresh().unwrap();
        assert_eq!(outcome.missing, 1);
        assert_eq!(outcome.pending, 1);
        assert_eq!(org.db().count_records(RecordState::Moved).unwrap(), 1);
        assert_eq!(org.db().count_records(RecordState::Error).unwrap(), 1);
    }

    #[test]
    fn test_mount_moves_when_clean_after_first_use() {
        let temp = TempDir::new().unwrap();
        let image = touch(&temp, "Tool.dmg");

        let mut org = organizer(&temp, enabled());
        org.detect_new_files().unwrap();

        let outcome = org.volume_mounted(&image).unwrap();
        assert_eq!(outcome.used, 1);
        assert_eq!(outcome.moved, 1);
        assert!(temp.path().join("Junk Installers/Tool.dmg").exists());
        assert!(org.installers().unwrap().is_empty());

        assert!(org.volume_mounted(&image).unwrap().is_empty());
    }

    #[test]
    fn test_launch_without_cleanup_only_marks_used() {
        let temp = TempDir::new().unwrap();
        let bundle = touch(&temp, "Editor.AppImage");

        let prefs = Preferences {
            clean_after_first_use: false,
            ..enabled()
        };
        let mut org = organizer(&temp, prefs);
        org.detect_new_files().unwrap();

        let outcome = org
            .app_launched(Path::new("/opt/apps/Editor.AppImage"))
            .unwrap();
        assert_eq!(outcome.used, 1);
        assert_eq!(outcome.moved, 0);
        assert!(bundle.exists());
        assert!(org.installers().unwrap()[0].used);
    }

    #[test]
    fn test_installer_cleanup_goes_through_notifier() {
        let temp = TempDir::new().unwrap();
        let image = touch(&temp, "Tool.dmg");
        let notifier = SharedNotifier::default();

        let mut org = organizer(&temp, enabled()).with_notifier(Box::new(notifier.clone()));
        org.detect_new_files().unwrap();
        org.volume_mounted(&image).unwrap();

        assert_eq!(*notifier.0.lock().unwrap(), vec!["Installer Cleaned".to_string()]);
    }

    #[test]
    fn test_destination_setup_uses_access_gate() {
        let temp = TempDir::new().unwrap();
        let gate = CountingGate::default();

        let mut org = organizer(&temp, Preferences::default()).with_access(Box::new(gate.clone()));
        org.prepare_destinations().unwrap();
        assert_eq!(gate.0.load(Ordering::SeqCst), Category::ALL.len());

        // Existing folders need no grant.
        org.prepare_destinations().unwrap();
        assert_eq!(gate.0.load(Ordering::SeqCst), Category::ALL.len());
    }

    #[test]
    fn test_prepare_destinations() {
        let temp = TempDir::new().unwrap();
        let mut org = organizer(&temp, Preferences::default());

        assert_eq!(org.prepare_destinations().unwrap(), 0);
        for category in Category::ALL {
            assert!(temp.path().join(category.default_folder()).is_dir());
        }
    }

    #[test]
    fn test_status_snapshot() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "a.pdf");
        touch(&temp, "b.png");

        let mut org = organizer(&temp, enabled());
        org.detect_pending_files().unwrap();
        org.organize_file(&temp.path().join("a.pdf")).unwrap();
        org.set_monitoring(true);

        let status = org.status_snapshot().unwrap();
        assert!(status.monitoring);
        assert!(status.enabled);
        assert_eq!(status.pending, 1);
        assert_eq!(status.recent_moves, 1);
        assert_eq!(status.total_moved, 1);
        assert_eq!(status.tracked_installers, 0);
        assert!(status.last_error.is_none());
    }
}
