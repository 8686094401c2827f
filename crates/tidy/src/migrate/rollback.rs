use crate::access::{with_access, AccessGate};
use crate::db::{ActivityEntry, FileRecord, LogAction, RecordState, Store};
use crate::error::{Result, TidyError};
use crate::migrate::{destination_lock, resolve_unique};
use crate::registry::FileRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

/// Moves organized files back into the inbox.
pub struct RollbackEngine<'a, D: Store + ?Sized> {
    db: &'a mut D,
    access: &'a dyn AccessGate,
}

impl<'a, D: Store + ?Sized> RollbackEngine<'a, D> {
    pub fn new(db: &'a mut D, access: &'a dyn AccessGate) -> Self {
        Self { db, access }
    }

    /// Reverts one moved or cleaned file and returns where it was restored.
    /// A file that was renamed out of the way keeps a numeric suffix.
    pub fn revert(&mut self, record: &FileRecord) -> Result<PathBuf> {
        if !record.state.is_revertible() {
            return Err(TidyError::InvalidStateTransition {
                from: record.state.as_str().to_string(),
                to: RecordState::Reverted.as_str().to_string(),
            });
        }

        let current = record
            .destination
            .clone()
            .ok_or_else(|| TidyError::DestinationFileMissing(record.path.clone()))?;

        if !current.exists() {
            log::warn!("File no longer exists at destination: {}", current.display());
            let err = TidyError::DestinationFileMissing(current.clone());
            self.log_failure(record, &current, &err)?;
            return Err(err);
        }

        log::info!(
            "Reverting {} -> {}",
            current.display(),
            record.path.display()
        );

        match self.restore(&current, &record.path) {
            Ok(restored) => {
                FileRegistry::new(&mut *self.db).record_reverted(record, &restored)?;
                Ok(restored)
            }
            Err(e) => {
                log::error!("Failed to revert {}: {}", record.file_name, e);
                self.log_failure(record, &current, &e)?;
                Err(e)
            }
        }
    }

    fn restore(&self, current: &Path, original: &Path) -> Result<PathBuf> {
        let inbox = original.parent().unwrap_or_else(|| Path::new("/"));

        with_access(self.access, inbox, || -> Result<PathBuf> {
            fs::create_dir_all(inbox)?;

            let lock = destination_lock(inbox);
            let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

            let target = resolve_unique(original)?;
            fs::rename(current, &target).map_err(|e| TidyError::MoveFailed {
                path: current.to_path_buf(),
                source: e,
            })?;
            Ok(target)
        })
    }

    fn log_failure(&mut self, record: &FileRecord, current: &Path, err: &TidyError) -> Result<()> {
        self.db.append_log(
            &ActivityEntry::new(&record.file_name, record.category, LogAction::Error, current)
                .with_details(format!("Failed to revert: {}", err)),
        )?;
        Ok(())
    }
}
