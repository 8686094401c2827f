use crate::access::{with_access, AccessGate};
use crate::alerts::Notifier;
use crate::classify::Category;
use crate::config::is_protected_home_folder;
use crate::confirm::{ConfirmationSource, Decision};
use crate::db::{file_name_of, Store};
use crate::error::{Result, TidyError};
use crate::migrate::{destination_lock, resolve_unique};
use crate::prefs::PreferenceStore;
use crate::registry::FileRegistry;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

pub const SYSTEM_FOLDER_HINT: &str =
    "Cannot access system folder. Choose a custom destination with `tidy config destination`.";

/// Moves inbox files into their category folders.
///
/// Holds no state of its own: every outcome lands in the registry and the
/// activity log of the borrowed store.
pub struct MoveEngine<'a, D: Store + ?Sized> {
    db: &'a mut D,
    prefs: &'a dyn PreferenceStore,
    inbox: &'a Path,
    access: &'a dyn AccessGate,
    notifier: &'a dyn Notifier,
}

impl<'a, D: Store + ?Sized> MoveEngine<'a, D> {
    pub fn new(
        db: &'a mut D,
        prefs: &'a dyn PreferenceStore,
        inbox: &'a Path,
        access: &'a dyn AccessGate,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            db,
            prefs,
            inbox,
            access,
            notifier,
        }
    }

    pub fn move_file(&mut self, source: &Path, category: Category) -> Result<PathBuf> {
        self.move_with_details(source, category, None)
    }

    /// Moves `source` to the destination for `category` and returns the final
    /// path. Vanished sources are dropped without a log entry; every other
    /// failure is logged and leaves an error record.
    pub fn move_with_details(
        &mut self,
        source: &Path,
        category: Category,
        details: Option<&str>,
    ) -> Result<PathBuf> {
        if !source.exists() {
            return self.drop_vanished(source, category);
        }

        let prefs = self.prefs.load()?;
        let dest_dir = prefs.destination_for(category, self.inbox);

        match self.relocate(source, &dest_dir) {
            Ok(final_path) => {
                FileRegistry::new(&mut *self.db).record_moved(source, category, &final_path, details)?;
                log::info!("Moved {} -> {}", source.display(), final_path.display());

                if category == Category::Installer {
                    self.db.remove_installer(source)?;
                    self.notifier.notify(
                        "Installer Cleaned",
                        &format!(
                            "{} has been moved to {}",
                            file_name_of(source),
                            category.default_folder()
                        ),
                    );
                }

                Ok(final_path)
            }
            Err(TidyError::SourceVanished(_)) => self.drop_vanished(source, category),
            Err(e) => {
                let details = match &e {
                    TidyError::DestinationUnavailable { hint: Some(hint), .. } => hint.clone(),
                    other => other.to_string(),
                };
                log::error!("Failed to move {}: {}", source.display(), details);
                FileRegistry::new(&mut *self.db).record_error(source, category, &details)?;
                Err(e)
            }
        }
    }

    /// Automatic move behind the confirmation gate. Returns `None` when the
    /// move was declined; the file is then left untouched.
    pub fn move_confirmed(
        &mut self,
        source: &Path,
        category: Category,
        confirm: &dyn ConfirmationSource,
    ) -> Result<Option<PathBuf>> {
        let mut prefs = self.prefs.load()?;

        if prefs.confirm_before_moving {
            let destination = prefs.destination_for(category, self.inbox);
            let name = file_name_of(source);

            let decision = confirm
                .ask(&name, category, &destination)
                .unwrap_or_else(|e| {
                    log::warn!("Confirmation for {} failed, skipping: {}", name, e);
                    Decision::Skip
                });

            match decision {
                Decision::Skip => {
                    log::info!("Skipped {} at user request", name);
                    return Ok(None);
                }
                Decision::ProceedAlways => {
                    prefs.confirm_before_moving = false;
                    self.prefs.save(&prefs)?;
                    log::info!("Confirmation before moving disabled");
                }
                Decision::Proceed => {}
            }
        }

        self.move_file(source, category).map(Some)
    }

    fn relocate(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        if !self.access.can_access(dest_dir) {
            return Err(unavailable(dest_dir, None));
        }

        with_access(self.access, dest_dir, || -> Result<PathBuf> {
            fs::create_dir_all(dest_dir).map_err(|e| unavailable(dest_dir, Some(e)))?;

            let file_name = source
                .file_name()
                .ok_or_else(|| TidyError::SourceVanished(source.to_path_buf()))?;

            let lock = destination_lock(dest_dir);
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

            let target = resolve_unique(&dest_dir.join(file_name))?;
            fs::rename(source, &target).map_err(|e| {
                if e.kind() == ErrorKind::NotFound && !source.exists() {
                    TidyError::SourceVanished(source.to_path_buf())
                } else {
                    TidyError::MoveFailed {
                        path: source.to_path_buf(),
                        source: e,
                    }
                }
            })?;

            Ok(target)
        })
    }

    fn drop_vanished(&mut self, source: &Path, category: Category) -> Result<PathBuf> {
        log::debug!("Source vanished before move: {}", source.display());
        FileRegistry::new(&mut *self.db).forget(source)?;
        if category == Category::Installer {
            self.db.remove_installer(source)?;
        }
        Err(TidyError::SourceVanished(source.to_path_buf()))
    }
}

fn unavailable(dir: &Path, cause: Option<std::io::Error>) -> TidyError {
    let hint = if is_protected_home_folder(dir) {
        Some(SYSTEM_FOLDER_HINT.to_string())
    } else {
        cause.map(|e| e.to_string())
    };
    TidyError::DestinationUnavailable {
        path: dir.to_path_buf(),
        hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::FsAccess;
    use crate::alerts::LogNotifier;
    use crate::classify::InstallerKind;
    use crate::confirm::FixedDecision;
    use crate::db::{
        ActivityDatabase, ActivityFilter, Database, InstallerDatabase, InstallerEntry, LogAction,
        RecordState, RegistryDatabase, SqliteDatabase,
    };
    use crate::prefs::{MemoryPreferences, Preferences};
    use chrono::Utc;
    use std::fs::File;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        db: SqliteDatabase,
        prefs: MemoryPreferences,
    }

    impl Fixture {
        fn new() -> Self {
            let mut db = SqliteDatabase::open_in_memory().unwrap();
            db.initialize().unwrap();
            Self {
                temp: TempDir::new().unwrap(),
                db,
                prefs: MemoryPreferences::new(Preferences::default()),
            }
        }

        fn inbox(&self) -> &Path {
            self.temp.path()
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.inbox().join(name);
            File::create(&path).unwrap();
            path
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<String>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, _body: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }
    }

    #[test]
    fn test_move_creates_destination() {
        let mut fx = Fixture::new();
        let source = fx.file("photo.jpg");
        let inbox = fx.inbox().to_path_buf();

        let final_path = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
            .move_file(&source, Category::Image)
            .unwrap();

        assert_eq!(final_path, inbox.join("Images").join("photo.jpg"));
        assert!(final_path.exists());
        assert!(!source.exists());

        let record = fx.db.get_record(&source).unwrap().unwrap();
        assert_eq!(record.state, RecordState::Moved);
        let log = fx.db.query_log(&ActivityFilter::default()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, LogAction::Moved);
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let mut fx = Fixture::new();
        let inbox = fx.inbox().to_path_buf();
        let docs = inbox.join("Documents");
        fs::create_dir_all(&docs).unwrap();
        File::create(docs.join("report.pdf")).unwrap();

        let mut moved = Vec::new();
        for _ in 0..2 {
            let source = fx.file("report.pdf");
            let path = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
                .move_file(&source, Category::Document)
                .unwrap();
            moved.push(path);
        }

        assert_eq!(moved[0], docs.join("report_1.pdf"));
        assert_eq!(moved[1], docs.join("report_2.pdf"));
    }

    #[test]
    fn test_vanished_source_is_silent() {
        let mut fx = Fixture::new();
        let inbox = fx.inbox().to_path_buf();
        let ghost = inbox.join("ghost.pdf");

        let result = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
            .move_file(&ghost, Category::Document);

        assert!(matches!(result, Err(TidyError::SourceVanished(_))));
        assert!(fx.db.query_log(&ActivityFilter::default()).unwrap().is_empty());
        assert!(fx.db.get_record(&ghost).unwrap().is_none());
    }

    #[test]
    fn test_unavailable_destination_is_logged() {
        let mut fx = Fixture::new();
        let inbox = fx.inbox().to_path_buf();
        let blocker = fx.file("blocker.bin");
        let source = fx.file("notes.txt");

        let mut prefs = Preferences::default();
        prefs.set_destination(
            Category::Document,
            &blocker.join("docs").to_string_lossy(),
        );
        fx.prefs.save(&prefs).unwrap();

        let result = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
            .move_file(&source, Category::Document);

        assert!(matches!(result, Err(TidyError::DestinationUnavailable { .. })));
        assert!(source.exists());
        assert_eq!(
            fx.db.get_record(&source).unwrap().unwrap().state,
            RecordState::Error
        );
        let log = fx.db.query_log(&ActivityFilter::default()).unwrap();
        assert_eq!(log[0].action, LogAction::Error);
    }

    #[test]
    fn test_installer_move_clears_tracking() {
        let mut fx = Fixture::new();
        let inbox = fx.inbox().to_path_buf();
        let source = fx.file("Setup.dmg");
        fx.db
            .upsert_installer(&InstallerEntry {
                path: source.clone(),
                name: "Setup.dmg".to_string(),
                kind: InstallerKind::DiskImage,
                first_seen: Utc::now(),
                used: false,
                used_at: None,
            })
            .unwrap();

        let notifier = RecordingNotifier::default();
        let final_path = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &notifier)
            .move_file(&source, Category::Installer)
            .unwrap();

        assert_eq!(final_path, inbox.join("Junk Installers").join("Setup.dmg"));
        assert!(fx.db.get_installer(&source).unwrap().is_none());
        assert_eq!(*notifier.0.lock().unwrap(), vec!["Installer Cleaned".to_string()]);
    }

    #[test]
    fn test_confirmation_gate() {
        let mut fx = Fixture::new();
        let inbox = fx.inbox().to_path_buf();
        let source = fx.file("clip.mp4");

        let mut prefs = Preferences::default();
        prefs.confirm_before_moving = true;
        fx.prefs.save(&prefs).unwrap();

        let skipped = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
            .move_confirmed(&source, Category::Video, &FixedDecision(Decision::Skip))
            .unwrap();
        assert!(skipped.is_none());
        assert!(source.exists());
        assert!(fx.db.get_record(&source).unwrap().is_none());

        let moved = MoveEngine::new(&mut fx.db, &fx.prefs, &inbox, &FsAccess, &LogNotifier)
            .move_confirmed(&source, Category::Video, &FixedDecision(Decision::ProceedAlways))
            .unwrap();
        assert!(moved.is_some());
        assert!(!fx.prefs.load().unwrap().confirm_before_moving);
    }
}
