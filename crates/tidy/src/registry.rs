use crate::classify::Category;
use crate::db::{
    file_name_of, ActivityDatabase, ActivityEntry, ActivityFilter, FileRecord, LogAction,
    RecordFilter, RecordState, RegistryDatabase,
};
use crate::error::{Result, TidyError};
use chrono::Utc;
use std::path::Path;

pub const PENDING_DETAILS: &str = "File pending organization";
pub const MISSING_AT_DESTINATION: &str =
    "File no longer exists at destination (possibly moved manually)";

/// Idempotency ledger over the record and activity tables.
///
/// Every transition replaces whatever record the path had before and keeps
/// the activity log in step: an entry that a transition supersedes (a pending
/// marker once the file is organized, a move once it is reverted) is removed
/// before the new entry is appended.
pub struct FileRegistry<'a, D: RegistryDatabase + ActivityDatabase + ?Sized> {
    db: &'a mut D,
}

impl<'a, D: RegistryDatabase + ActivityDatabase + ?Sized> FileRegistry<'a, D> {
    pub fn new(db: &'a mut D) -> Self {
        Self { db }
    }

    pub fn get(&self, path: &Path) -> Result<Option<FileRecord>> {
        self.db.get_record(path)
    }

    pub fn query(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>> {
        self.db.query_records(filter)
    }

    /// Marks `path` pending unless it already has a pending, moved or tracked
    /// record. Returns whether a new pending record was written.
    pub fn record_pending(&mut self, path: &Path, extension: &str, category: Category) -> Result<bool> {
        let record = FileRecord::new(path, extension, category, RecordState::Pending);
        let inserted = self.db.insert_pending_if_absent(&record)?;

        if inserted {
            self.db.append_log(
                &ActivityEntry::new(&record.file_name, category, LogAction::Pending, path)
                    .with_details(PENDING_DETAILS),
            )?;
            log::debug!("Marked as pending: {}", path.display());
        }

        Ok(inserted)
    }

    pub fn record_moved(
        &mut self,
        path: &Path,
        category: Category,
        destination: &Path,
        details: Option<&str>,
    ) -> Result<FileRecord> {
        let mut record = self.successor(path, category, RecordState::Moved)?;
        record.destination = Some(destination.to_path_buf());
        self.db.put_record(&record)?;

        self.drop_log_entries(path, LogAction::Pending)?;
        let mut entry = ActivityEntry::new(&record.file_name, category, LogAction::Moved, path)
            .with_destination(destination);
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        self.db.append_log(&entry)?;

        Ok(record)
    }

    /// Records an installer as tracked. The tracker writes the log entry.
    pub fn record_tracked(&mut self, path: &Path, extension: &str) -> Result<FileRecord> {
        let mut record = self.successor(path, Category::Installer, RecordState::Tracked)?;
        record.extension = extension.to_string();
        self.db.put_record(&record)?;
        self.drop_log_entries(path, LogAction::Pending)?;
        Ok(record)
    }

    pub fn record_error(&mut self, path: &Path, category: Category, details: &str) -> Result<FileRecord> {
        let mut record = self.successor(path, category, RecordState::Error)?;
        record.error = Some(details.to_string());
        self.db.put_record(&record)?;

        self.db.append_log(
            &ActivityEntry::new(&record.file_name, category, LogAction::Error, path)
                .with_details(details),
        )?;

        Ok(record)
    }

    /// Replaces the moved or cleaned record for `moved.path` with a reverted
    /// record keyed by `restored_to`, which may differ from the original path
    /// when the name was taken in the meantime.
    pub fn record_reverted(&mut self, moved: &FileRecord, restored_to: &Path) -> Result<FileRecord> {
        if !moved.state.is_revertible() {
            return Err(TidyError::InvalidStateTransition {
                from: moved.state.as_str().to_string(),
                to: RecordState::Reverted.as_str().to_string(),
            });
        }

        self.db.delete_record(&moved.path)?;

        let mut record = FileRecord::new(
            restored_to,
            &moved.extension,
            moved.category,
            RecordState::Reverted,
        );
        record.discovered_at = moved.discovered_at;
        record.file_name = file_name_of(restored_to);
        self.db.put_record(&record)?;

        self.drop_log_entries(&moved.path, LogAction::Moved)?;
        self.drop_log_entries(&moved.path, LogAction::Cleaned)?;
        let from = moved.destination.as_deref().unwrap_or(&moved.path);
        self.db.append_log(
            &ActivityEntry::new(&moved.file_name, moved.category, LogAction::Reverted, from)
                .with_destination(restored_to)
                .with_details("Moved back to inbox"),
        )?;

        Ok(record)
    }

    /// Records that a tracked installer was evicted by the cleanup sweep.
    pub fn record_cleaned(&mut self, path: &Path, destination: &Path, days: u32) -> Result<FileRecord> {
        let mut record = self.successor(path, Category::Installer, RecordState::Cleaned)?;
        record.destination = Some(destination.to_path_buf());
        self.db.put_record(&record)?;

        self.db.append_log(
            &ActivityEntry::new(&record.file_name, Category::Installer, LogAction::Cleaned, path)
                .with_destination(destination)
                .with_details(format!("Auto-cleaned after {} days", days)),
        )?;

        Ok(record)
    }

    /// Turns a moved record whose file disappeared from its destination into
    /// an error record.
    pub fn record_missing(&mut self, moved: &FileRecord) -> Result<FileRecord> {
        let mut record = moved.clone();
        record.state = RecordState::Error;
        record.error = Some(MISSING_AT_DESTINATION.to_string());
        record.updated_at = Utc::now();
        self.db.put_record(&record)?;

        self.drop_log_entries(&moved.path, LogAction::Moved)?;
        let mut entry =
            ActivityEntry::new(&moved.file_name, moved.category, LogAction::Error, &moved.path)
                .with_details(MISSING_AT_DESTINATION);
        if let Some(dest) = &moved.destination {
            entry = entry.with_destination(dest);
        }
        self.db.append_log(&entry)?;

        Ok(record)
    }

    /// Removes the record for a path that no longer exists and was never
    /// moved. Moved records are kept.
    pub fn forget(&mut self, path: &Path) -> Result<bool> {
        match self.db.get_record(path)? {
            Some(record) if record.state != RecordState::Moved => self.db.delete_record(path),
            _ => Ok(false),
        }
    }

    /// Drops every pending record together with its log entry.
    pub fn clear_pending(&mut self) -> Result<usize> {
        let removed = self.db.delete_records_in_state(RecordState::Pending)?;
        let entries = self.db.query_log(&ActivityFilter {
            action: Some(LogAction::Pending),
            ..Default::default()
        })?;
        for entry in entries {
            self.db.remove_log(entry.id)?;
        }
        Ok(removed)
    }

    fn successor(&self, path: &Path, category: Category, state: RecordState) -> Result<FileRecord> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let mut record = FileRecord::new(path, &extension, category, state);
        if let Some(previous) = self.db.get_record(path)? {
            record.discovered_at = previous.discovered_at;
        }
        Ok(record)
    }

    fn drop_log_entries(&mut self, source: &Path, action: LogAction) -> Result<()> {
        let entries = self.db.query_log(&ActivityFilter {
            action: Some(action),
            source_path: Some(source.to_string_lossy().to_string()),
            ..Default::default()
        })?;
        for entry in entries {
            self.db.remove_log(entry.id)?;
        }
        Ok(())
    }
}
