pub mod access;
pub mod alerts;
pub mod classify;
pub mod config;
pub mod confirm;
pub mod control;
pub mod db;
pub mod error;
pub mod index;
pub mod installer;
pub mod migrate;
pub mod organizer;
pub mod prefs;
pub mod registry;
pub mod util;
pub mod watcher;

pub use access::{with_access, AccessGate, FsAccess};
pub use alerts::{LogNotifier, Notifier};
pub use classify::{Category, CategoryOverrides, Classifier, ExtensionTable, InstallerKind};
pub use config::Config;
pub use confirm::{ConfirmationSource, Decision, DialogConfirm, FixedDecision};
pub use control::{
    connect_or_lock, Connection, ControlClient, ControlRequest, ControlResponse, ControlServer,
    OrganizerControl, ServiceLock,
};
pub use db::{
    ActivityDatabase, ActivityEntry, ActivityFilter, Database, FileRecord, InstallerDatabase,
    InstallerEntry, LogAction, RecordFilter, RecordState, RegistryDatabase, SqliteDatabase, Store,
};
pub use error::{Result, TidyError};
pub use index::{InboxEntry, InboxScanner, ScanOptions, ScanStats};
pub use installer::{InstallerLifecycleTracker, UsageSignal};
pub use migrate::{resolve_unique, MoveEngine, RollbackEngine};
pub use organizer::{BatchOutcome, Organizer, StatusSnapshot, RECENT_WINDOW_MINUTES};
pub use prefs::{MemoryPreferences, PreferenceStore, Preferences, TomlPreferences};
pub use registry::FileRegistry;
pub use watcher::{spawn_lane, Lane, LaneMessage, ScheduleConfig, ServiceHandle, Watcher};
