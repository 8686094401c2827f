use crate::db::Store;
use crate::error::{Result, TidyError};
use crate::organizer::{BatchOutcome, Organizer, StatusSnapshot};
use std::path::PathBuf;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot, watch};

pub type Reply<T> = oneshot::Sender<Result<T>>;

/// Work items for the serialized lane. Requests that produce an answer carry
/// the sender to reply on.
#[derive(Debug)]
pub enum LaneMessage {
    DetectNew,
    DetectPending,
    Cleanup,
    PrepareDestinations,
    Monitoring(bool),
    ScanNow(Reply<BatchOutcome>),
    OrganizePending(Reply<BatchOutcome>),
    OrganizeFile(PathBuf, Reply<PathBuf>),
    SweepNow(Reply<BatchOutcome>),
    Revert(i64, Reply<PathBuf>),
    RevertRecent(i64, Reply<BatchOutcome>),
    RevertAll(Reply<BatchOutcome>),
    VolumeMounted(PathBuf),
    AppLaunched(PathBuf),
    Refresh(Reply<BatchOutcome>),
    ReloadCategories(Reply<()>),
    Shutdown,
}

/// Cloneable front door to a running lane.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<LaneMessage>,
    status: watch::Receiver<StatusSnapshot>,
}

impl ServiceHandle {
    pub fn send(&self, message: LaneMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| TidyError::LaneClosed)
    }

    async fn request<T, F>(&self, make: F) -> Result<T>
    where
        F: FnOnce(Reply<T>) -> LaneMessage,
    {
        let (reply, answer) = oneshot::channel();
        self.send(make(reply))?;
        answer.await.map_err(|_| TidyError::LaneClosed)?
    }

    pub async fn scan_now(&self) -> Result<BatchOutcome> {
        self.request(LaneMessage::ScanNow).await
    }

    pub async fn organize_all_pending(&self) -> Result<BatchOutcome> {
        self.request(LaneMessage::OrganizePending).await
    }

    pub async fn organize_file(&self, path: PathBuf) -> Result<PathBuf> {
        self.request(|reply| LaneMessage::OrganizeFile(path, reply))
            .await
    }

    pub async fn cleanup_sweep(&self) -> Result<BatchOutcome> {
        self.request(LaneMessage::SweepNow).await
    }

    pub async fn revert(&self, log_id: i64) -> Result<PathBuf> {
        self.request(|reply| LaneMessage::Revert(log_id, reply)).await
    }

    pub async fn revert_recent(&self, minutes: i64) -> Result<BatchOutcome> {
        self.request(|reply| LaneMessage::RevertRecent(minutes, reply))
            .await
    }

    pub async fn revert_all(&self) -> Result<BatchOutcome> {
        self.request(LaneMessage::RevertAll).await
    }

    pub async fn refresh(&self) -> Result<BatchOutcome> {
        self.request(LaneMessage::Refresh).await
    }

    pub async fn reload_categories(&self) -> Result<()> {
        self.request(LaneMessage::ReloadCategories).await
    }

    pub fn volume_mounted(&self, image_path: PathBuf) -> Result<()> {
        self.send(LaneMessage::VolumeMounted(image_path))
    }

    pub fn app_launched(&self, bundle_path: PathBuf) -> Result<()> {
        self.send(LaneMessage::AppLaunched(bundle_path))
    }

    /// Latest published snapshot. Never waits on the lane.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }
}

/// The lane thread. Owns the organizer until shut down.
pub struct Lane {
    handle: ServiceHandle,
    thread: Option<JoinHandle<()>>,
}

impl Lane {
    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    /// Lets queued work finish, then stops the thread.
    pub async fn shutdown(mut self) -> Result<()> {
        // A lane that already exited has nothing left to stop.
        let _ = self.handle.send(LaneMessage::Shutdown);

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|e| TidyError::Config(format!("Failed to join lane: {}", e)))?
                .map_err(|_| TidyError::Config("Lane thread panicked".to_string()))?;
        }
        Ok(())
    }
}

/// Moves `organizer` onto a dedicated thread that processes lane messages one
/// at a time, in arrival order.
pub fn spawn_lane<D: Store + Send + 'static>(organizer: Organizer<D>) -> Result<Lane> {
    let (tx, rx) = mpsc::unbounded_channel();
    let initial = organizer.status_snapshot().unwrap_or_default();
    let (status_tx, status_rx) = watch::channel(initial);

    let thread = std::thread::Builder::new()
        .name("tidy-lane".to_string())
        .spawn(move || run_lane(organizer, rx, status_tx))?;

    Ok(Lane {
        handle: ServiceHandle {
            tx,
            status: status_rx,
        },
        thread: Some(thread),
    })
}

fn run_lane<D: Store>(
    mut organizer: Organizer<D>,
    mut rx: mpsc::UnboundedReceiver<LaneMessage>,
    status: watch::Sender<StatusSnapshot>,
) {
    log::debug!("Lane started");

    while let Some(message) = rx.blocking_recv() {
        if matches!(message, LaneMessage::Shutdown) {
            break;
        }
        dispatch(&mut organizer, &status, message);
    }

    organizer.set_monitoring(false);
    publish(&organizer, &status);
    log::debug!("Lane stopped");
}

fn dispatch<D: Store>(
    org: &mut Organizer<D>,
    status: &watch::Sender<StatusSnapshot>,
    message: LaneMessage,
) {
    match message {
        LaneMessage::DetectNew => report("New-file scan", org.detect_new_files()),
        LaneMessage::DetectPending => report("Pending scan", org.detect_pending_files()),
        LaneMessage::Cleanup => report("Cleanup sweep", org.cleanup_sweep()),
        LaneMessage::PrepareDestinations => {
            if let Err(e) = org.prepare_destinations() {
                log::error!("Failed to prepare destinations: {}", e);
            }
        }
        LaneMessage::Monitoring(on) => org.set_monitoring(on),
        LaneMessage::VolumeMounted(path) => report("Mount", org.volume_mounted(&path)),
        LaneMessage::AppLaunched(path) => report("Launch", org.app_launched(&path)),
        LaneMessage::ScanNow(reply) => {
            let result = org.scan_now();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::OrganizePending(reply) => {
            let result = org.organize_all_pending();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::OrganizeFile(path, reply) => {
            let result = org.organize_file(&path);
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::SweepNow(reply) => {
            let result = org.cleanup_sweep();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::Revert(id, reply) => {
            let result = org.revert(id);
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::RevertRecent(minutes, reply) => {
            let result = org.revert_recent(minutes);
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::RevertAll(reply) => {
            let result = org.revert_all();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::Refresh(reply) => {
            let result = org.refresh();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::ReloadCategories(reply) => {
            let result = org.reload_categories();
            answer(org, status, reply, result);
            return;
        }
        LaneMessage::Shutdown => {}
    }

    publish(org, status);
}

/// Publishes before replying so a caller that awaited the answer sees the
/// matching snapshot.
fn answer<D: Store, T>(
    org: &Organizer<D>,
    status: &watch::Sender<StatusSnapshot>,
    reply: Reply<T>,
    result: Result<T>,
) {
    publish(org, status);
    // The requester may have given up waiting.
    let _ = reply.send(result);
}

fn publish<D: Store>(org: &Organizer<D>, status: &watch::Sender<StatusSnapshot>) {
    match org.status_snapshot() {
        Ok(snapshot) => {
            status.send_replace(snapshot);
        }
        Err(e) => log::warn!("Failed to read status: {}", e),
    }
}

fn report(label: &str, result: Result<BatchOutcome>) {
    match result {
        Ok(outcome) if !outcome.is_empty() => log::info!("{} finished: {:?}", label, outcome),
        Ok(_) => {}
        Err(e) => log::error!("{} failed: {}", label, e),
    }
}
