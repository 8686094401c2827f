use crate::control::{ControlRequest, ControlResponse, OrganizerControl};
use crate::error::{Result, TidyError};
use crate::organizer::{BatchOutcome, StatusSnapshot};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Blocking connection to a watcher's control socket. One request is in
/// flight at a time.
#[derive(Debug)]
pub struct ControlClient {
    connection: BufReader<UnixStream>,
}

impl ControlClient {
    /// `None` when nothing is listening at `path`, including a socket file
    /// left behind by a watcher that exited.
    pub fn connect(path: &Path) -> Result<Option<Self>> {
        match UnixStream::connect(path) {
            Ok(stream) => Ok(Some(Self {
                connection: BufReader::new(stream),
            })),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
                log::debug!("No watcher at {}: {}", path.display(), e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sends one request and waits for its answer. A `Failed` answer becomes
    /// [`TidyError::Remote`].
    pub fn call(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');

        let stream = self.connection.get_mut();
        stream.write_all(&payload)?;
        stream.flush()?;

        let mut line = String::new();
        if self.connection.read_line(&mut line)? == 0 {
            return Err(TidyError::LaneClosed);
        }

        match serde_json::from_str(&line)? {
            ControlResponse::Failed { message } => Err(TidyError::Remote(message)),
            response => Ok(response),
        }
    }

    fn outcome(&mut self, request: ControlRequest) -> Result<BatchOutcome> {
        match self.call(&request)? {
            ControlResponse::Outcome { outcome } => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    fn path(&mut self, request: ControlRequest) -> Result<PathBuf> {
        match self.call(&request)? {
            ControlResponse::Path { path } => Ok(path),
            other => Err(unexpected(other)),
        }
    }

    fn accepted(&mut self, request: ControlRequest) -> Result<Option<BatchOutcome>> {
        match self.call(&request)? {
            ControlResponse::Accepted => Ok(None),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: ControlResponse) -> TidyError {
    TidyError::Protocol(format!("{:?}", response))
}

impl OrganizerControl for ControlClient {
    fn scan_now(&mut self) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::ScanNow)
    }

    fn organize_all_pending(&mut self) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::OrganizePending)
    }

    fn organize_file(&mut self, path: &Path) -> Result<PathBuf> {
        self.path(ControlRequest::OrganizeFile {
            path: path.to_path_buf(),
        })
    }

    fn revert(&mut self, log_id: i64) -> Result<PathBuf> {
        self.path(ControlRequest::Revert { log_id })
    }

    fn revert_recent(&mut self, minutes: i64) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::RevertRecent { minutes })
    }

    fn revert_all(&mut self) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::RevertAll)
    }

    fn refresh(&mut self) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::Refresh)
    }

    fn cleanup_sweep(&mut self) -> Result<BatchOutcome> {
        self.outcome(ControlRequest::CleanupSweep)
    }

    fn volume_mounted(&mut self, image_path: &Path) -> Result<Option<BatchOutcome>> {
        self.accepted(ControlRequest::VolumeMounted {
            path: image_path.to_path_buf(),
        })
    }

    fn app_launched(&mut self, bundle_path: &Path) -> Result<Option<BatchOutcome>> {
        self.accepted(ControlRequest::AppLaunched {
            path: bundle_path.to_path_buf(),
        })
    }

    fn reload_categories(&mut self) -> Result<()> {
        match self.call(&ControlRequest::ReloadCategories)? {
            ControlResponse::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn status(&mut self) -> Result<StatusSnapshot> {
        match self.call(&ControlRequest::Status)? {
            ControlResponse::Status { status } => Ok(status),
            other => Err(unexpected(other)),
        }
    }
}
