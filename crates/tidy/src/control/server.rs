use crate::control::{ControlRequest, ControlResponse};
use crate::error::Result;
use crate::organizer::BatchOutcome;
use crate::watcher::ServiceHandle;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

/// Control socket of a running watcher. Stops accepting and removes the socket
/// file when dropped.
pub struct ControlServer {
    path: PathBuf,
    task: JoinHandle<()>,
}

impl ControlServer {
    /// Binds `path` and answers requests through `lane`. A socket file left
    /// by an earlier watcher is replaced, so the caller must hold the
    /// service lock. Must be called from within a Tokio runtime.
    pub fn start(path: &Path, lane: ServiceHandle) -> Result<Self> {
        if path.exists() {
            log::debug!("Removing stale control socket {}", path.display());
            fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)?;
        let task = tokio::spawn(accept_loop(listener, lane));
        log::info!("Accepting commands on {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.task.abort();
        if let Err(e) = fs::remove_file(&self.path) {
            log::debug!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

async fn accept_loop(listener: UnixListener, lane: ServiceHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let lane = lane.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, lane).await {
                        log::warn!("Control connection failed: {}", e);
                    }
                });
            }
            Err(e) => log::warn!("Failed to accept control connection: {}", e),
        }
    }
}

async fn serve_connection(stream: UnixStream, lane: ServiceHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => {
                log::debug!("Control request: {:?}", request);
                execute(&lane, request).await
            }
            Err(e) => ControlResponse::Failed {
                message: format!("Malformed request: {}", e),
            },
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
    }

    Ok(())
}

/// Runs one request on the lane. Errors are answered, never dropped.
pub async fn execute(lane: &ServiceHandle, request: ControlRequest) -> ControlResponse {
    let result = match request {
        ControlRequest::ScanNow => lane.scan_now().await.map(outcome),
        ControlRequest::OrganizePending => lane.organize_all_pending().await.map(outcome),
        ControlRequest::OrganizeFile { path } => lane.organize_file(path).await.map(moved_to),
        ControlRequest::Revert { log_id } => lane.revert(log_id).await.map(moved_to),
        ControlRequest::RevertRecent { minutes } => lane.revert_recent(minutes).await.map(outcome),
        ControlRequest::RevertAll => lane.revert_all().await.map(outcome),
        ControlRequest::Refresh => lane.refresh().await.map(outcome),
        ControlRequest::CleanupSweep => lane.cleanup_sweep().await.map(outcome),
        ControlRequest::VolumeMounted { path } => {
            lane.volume_mounted(path).map(|()| ControlResponse::Accepted)
        }
        ControlRequest::AppLaunched { path } => {
            lane.app_launched(path).map(|()| ControlResponse::Accepted)
        }
        ControlRequest::ReloadCategories => {
            lane.reload_categories().await.map(|()| ControlResponse::Done)
        }
        ControlRequest::Status => Ok(ControlResponse::Status {
            status: lane.status(),
        }),
    };

    result.unwrap_or_else(|e| ControlResponse::Failed {
        message: e.to_string(),
    })
}

fn outcome(outcome: BatchOutcome) -> ControlResponse {
    ControlResponse::Outcome { outcome }
}

fn moved_to(path: PathBuf) -> ControlResponse {
    ControlResponse::Path { path }
}
