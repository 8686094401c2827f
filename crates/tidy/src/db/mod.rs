pub mod activity;
pub mod installers;
pub mod records;
pub mod schema;

use crate::classify::{Category, InstallerKind};
use crate::error::{Result, TidyError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use activity::{ActivityDatabase, ActivityFilter, MAX_LOG_ENTRIES};
pub use installers::InstallerDatabase;
pub use records::{RecordFilter, RegistryDatabase};

/// Lifecycle state of a file observed in the inbox.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    Tracked,
    Moved,
    Cleaned,
    Reverted,
    Error,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Tracked => "tracked",
            RecordState::Moved => "moved",
            RecordState::Cleaned => "cleaned",
            RecordState::Reverted => "reverted",
            RecordState::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RecordState::Pending),
            "tracked" => Ok(RecordState::Tracked),
            "moved" => Ok(RecordState::Moved),
            "cleaned" => Ok(RecordState::Cleaned),
            "reverted" => Ok(RecordState::Reverted),
            "error" => Ok(RecordState::Error),
            _ => Err(TidyError::Config(format!("Invalid record state: {}", s))),
        }
    }

    /// Reverted and cleaned records no longer take part in duplicate
    /// suppression.
    pub fn is_live(&self) -> bool {
        !matches!(self, RecordState::Reverted | RecordState::Cleaned)
    }

    /// States whose file sits in a destination folder and can be moved back.
    pub const REVERTIBLE: [RecordState; 2] = [RecordState::Moved, RecordState::Cleaned];

    pub fn is_revertible(&self) -> bool {
        Self::REVERTIBLE.contains(self)
    }

    /// States that stop the pending scan from marking the path again.
    pub fn blocks_pending(&self) -> bool {
        matches!(
            self,
            RecordState::Pending | RecordState::Moved | RecordState::Tracked
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub extension: String,
    pub category: Category,
    pub state: RecordState,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub destination: Option<PathBuf>,
    pub error: Option<String>,
}

impl FileRecord {
    pub fn new(path: &Path, extension: &str, category: Category, state: RecordState) -> Self {
        let now = Utc::now();
        Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            extension: extension.to_string(),
            category,
            state,
            discovered_at: now,
            updated_at: now,
            destination: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallerEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: InstallerKind,
    pub first_seen: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogAction {
    Moved,
    Tracked,
    Cleaned,
    Error,
    Mounted,
    Launched,
    Pending,
    Reverted,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Moved => "moved",
            LogAction::Tracked => "tracked",
            LogAction::Cleaned => "cleaned",
            LogAction::Error => "error",
            LogAction::Mounted => "mounted",
            LogAction::Launched => "launched",
            LogAction::Pending => "pending",
            LogAction::Reverted => "reverted",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "moved" => Ok(LogAction::Moved),
            "tracked" => Ok(LogAction::Tracked),
            "cleaned" => Ok(LogAction::Cleaned),
            "error" => Ok(LogAction::Error),
            "mounted" => Ok(LogAction::Mounted),
            "launched" => Ok(LogAction::Launched),
            "pending" => Ok(LogAction::Pending),
            "reverted" => Ok(LogAction::Reverted),
            _ => Err(TidyError::Config(format!("Invalid log action: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub category: Category,
    pub action: LogAction,
    pub source_path: String,
    pub destination_path: Option<String>,
    pub details: Option<String>,
}

impl ActivityEntry {
    pub fn new(file_name: &str, category: Category, action: LogAction, source: &Path) -> Self {
        Self {
            id: 0,
            timestamp: Utc::now(),
            file_name: file_name.to_string(),
            category,
            action,
            source_path: source.to_string_lossy().to_string(),
            destination_path: None,
            details: None,
        }
    }

    pub fn with_destination(mut self, destination: &Path) -> Self {
        self.destination_path = Some(destination.to_string_lossy().to_string());
        self
    }

    pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub trait Database {
    fn initialize(&mut self) -> Result<()>;
}

/// Everything the organizer needs from its backing store.
pub trait Store: Database + RegistryDatabase + InstallerDatabase + ActivityDatabase {}

impl<T: Database + RegistryDatabase + InstallerDatabase + ActivityDatabase> Store for T {}

pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Database for SqliteDatabase {
    fn initialize(&mut self) -> Result<()> {
        schema::initialize_schema(&self.conn)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Fixed-width UTC timestamps so stored values sort lexically.
pub(crate) fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_db_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        })
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_live_and_blocking_states() {
        assert!(RecordState::Pending.is_live());
        assert!(RecordState::Error.is_live());
        assert!(!RecordState::Reverted.is_live());
        assert!(!RecordState::Cleaned.is_live());

        assert!(RecordState::Moved.blocks_pending());
        assert!(RecordState::Tracked.blocks_pending());
        assert!(!RecordState::Error.blocks_pending());
        assert!(!RecordState::Reverted.blocks_pending());
    }

    #[test]
    fn test_db_time_is_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        assert!(to_db_time(&early) < to_db_time(&late));
        assert_eq!(parse_db_time(&to_db_time(&late)), late);
    }

    #[test]
    fn test_parse_sqlite_default_time() {
        let parsed = parse_db_time("2024-05-06 07:08:09");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
    }
}
