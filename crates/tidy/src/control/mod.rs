//! Control channel between one-shot commands and a running watcher.
//!
//! A watcher holds the [`ServiceLock`] for its inbox and answers
//! newline-delimited JSON requests on a Unix socket, executing each one on its
//! lane. Other commands forward their work through [`ControlClient`]; when no
//! watcher is listening they take the lock themselves and drive an
//! [`Organizer`] directly, so two processes never move files at once.

pub mod client;
pub mod lock;
pub mod server;

pub use client::ControlClient;
pub use lock::ServiceLock;
pub use server::ControlServer;

use crate::db::Store;
use crate::error::Result;
use crate::organizer::{BatchOutcome, Organizer, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ControlRequest {
    ScanNow,
    OrganizePending,
    OrganizeFile { path: PathBuf },
    Revert { log_id: i64 },
    RevertRecent { minutes: i64 },
    RevertAll,
    Refresh,
    CleanupSweep,
    VolumeMounted { path: PathBuf },
    AppLaunched { path: PathBuf },
    ReloadCategories,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum ControlResponse {
    Outcome { outcome: BatchOutcome },
    Path { path: PathBuf },
    /// Queued on the lane without waiting for the result.
    Accepted,
    Done,
    Status { status: StatusSnapshot },
    Failed { message: String },
}

/// Operations that change the inbox, served either by an organizer in this
/// process or by a watcher's lane.
pub trait OrganizerControl {
    fn scan_now(&mut self) -> Result<BatchOutcome>;
    fn organize_all_pending(&mut self) -> Result<BatchOutcome>;
    fn organize_file(&mut self, path: &Path) -> Result<PathBuf>;
    fn revert(&mut self, log_id: i64) -> Result<PathBuf>;
    fn revert_recent(&mut self, minutes: i64) -> Result<BatchOutcome>;
    fn revert_all(&mut self) -> Result<BatchOutcome>;
    fn refresh(&mut self) -> Result<BatchOutcome>;
    fn cleanup_sweep(&mut self) -> Result<BatchOutcome>;
    /// `None` when the signal was handed to a watcher and runs later.
    fn volume_mounted(&mut self, image_path: &Path) -> Result<Option<BatchOutcome>>;
    fn app_launched(&mut self, bundle_path: &Path) -> Result<Option<BatchOutcome>>;
    fn reload_categories(&mut self) -> Result<()>;
    fn status(&mut self) -> Result<StatusSnapshot>;
}

impl<D: Store> OrganizerControl for Organizer<D> {
    fn scan_now(&mut self) -> Result<BatchOutcome> {
        Organizer::scan_now(self)
    }

    fn organize_all_pending(&mut self) -> Result<BatchOutcome> {
        Organizer::organize_all_pending(self)
    }

    fn organize_file(&mut self, path: &Path) -> Result<PathBuf> {
        Organizer::organize_file(self, path)
    }

    fn revert(&mut self, log_id: i64) -> Result<PathBuf> {
        Organizer::revert(self, log_id)
    }

    fn revert_recent(&mut self, minutes: i64) -> Result<BatchOutcome> {
        Organizer::revert_recent(self, minutes)
    }

    fn revert_all(&mut self) -> Result<BatchOutcome> {
        Organizer::revert_all(self)
    }

    fn refresh(&mut self) -> Result<BatchOutcome> {
        Organizer::refresh(self)
    }

    fn cleanup_sweep(&mut self) -> Result<BatchOutcome> {
        Organizer::cleanup_sweep(self)
    }

    fn volume_mounted(&mut self, image_path: &Path) -> Result<Option<BatchOutcome>> {
        Organizer::volume_mounted(self, image_path).map(Some)
    }

    fn app_launched(&mut self, bundle_path: &Path) -> Result<Option<BatchOutcome>> {
        Organizer::app_launched(self, bundle_path).map(Some)
    }

    fn reload_categories(&mut self) -> Result<()> {
        Organizer::reload_categories(self)
    }

    fn status(&mut self) -> Result<StatusSnapshot> {
        self.status_snapshot()
    }
}

/// Who runs a mutating command.
pub enum Connection {
    /// A watcher is listening; requests go to its lane.
    Remote(ControlClient),
    /// No watcher; this process now owns the inbox until the lock drops.
    Local(ServiceLock),
}

/// Connects to the watcher serving `socket_path`, or takes the lock at
/// `lock_path` when none is listening. Fails with
/// [`TidyError::ServiceBusy`](crate::TidyError::ServiceBusy) when another
/// process holds the lock without serving requests.
pub fn connect_or_lock(socket_path: &Path, lock_path: &Path) -> Result<Connection> {
    if let Some(client) = ControlClient::connect(socket_path)? {
        log::debug!("Forwarding to watcher at {}", socket_path.display());
        return Ok(Connection::Remote(client));
    }
    ServiceLock::try_acquire(lock_path).map(Connection::Local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ControlRequest::OrganizeFile {
            path: PathBuf::from("/inbox/a.pdf"),
        };
        let line = serde_json::to_string(&request).unwrap();
        assert_eq!(line, r#"{"request":"organize_file","path":"/inbox/a.pdf"}"#);

        let parsed: ControlRequest = serde_json::from_str(r#"{"request":"scan_now"}"#).unwrap();
        assert_eq!(parsed, ControlRequest::ScanNow);
    }

    #[test]
    fn test_failed_response_wire_format() {
        let line = r#"{"response":"failed","message":"Record not found: x"}"#;
        let parsed: ControlResponse = serde_json::from_str(line).unwrap();
        assert_eq!(
            parsed,
            ControlResponse::Failed {
                message: "Record not found: x".to_string()
            }
        );
    }
}
