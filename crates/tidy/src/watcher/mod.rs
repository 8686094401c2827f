//! Directory monitoring and the serialized processing lane.
//!
//! Every trigger (change notification, backup timer, cleanup timer, manual
//! request, lifecycle signal) becomes a [`LaneMessage`]. A single lane thread
//! owns the [`Organizer`](crate::organizer::Organizer) and handles messages
//! one at a time, so registry updates and moves never interleave.

pub mod lane;

pub use lane::{spawn_lane, Lane, LaneMessage, Reply, ServiceHandle};

use crate::error::{Result, TidyError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const BACKUP_SCAN_INTERVAL: Duration = Duration::from_secs(10);
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Wait after a change notification before scanning.
    pub settle_delay: Duration,
    pub backup_interval: Duration,
    pub cleanup_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            backup_interval: BACKUP_SCAN_INTERVAL,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

struct Monitor {
    _watcher: RecommendedWatcher,
    tasks: Vec<JoinHandle<()>>,
}

/// Stopped/Monitoring toggle over one inbox.
pub struct Watcher {
    inbox: PathBuf,
    lane: ServiceHandle,
    schedule: ScheduleConfig,
    active: Option<Monitor>,
}

impl Watcher {
    pub fn new<P: Into<PathBuf>>(inbox: P, lane: ServiceHandle, schedule: ScheduleConfig) -> Self {
        Self {
            inbox: inbox.into(),
            lane,
            schedule,
            active: None,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.active.is_some()
    }

    /// Subscribes to the inbox and starts both timers. Must be called from
    /// within a Tokio runtime. Starting twice is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        if !self.inbox.is_dir() {
            return Err(TidyError::WatchSetupFailed {
                path: self.inbox.clone(),
                message: "not a directory".to_string(),
            });
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_relevant(&event) => {
                    log::trace!("Inbox change: {:?}", event.kind);
                    // Receiver gone means monitoring was stopped.
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => log::warn!("Watch error: {}", e),
            }
        })
        .map_err(|e| watch_failed(&self.inbox, e))?;

        watcher
            .watch(&self.inbox, RecursiveMode::NonRecursive)
            .map_err(|e| watch_failed(&self.inbox, e))?;

        self.lane.send(LaneMessage::PrepareDestinations)?;
        self.lane.send(LaneMessage::DetectPending)?;
        self.lane.send(LaneMessage::Monitoring(true))?;

        let tasks = vec![
            tokio::spawn(settle_changes(
                event_rx,
                self.lane.clone(),
                self.schedule.settle_delay,
            )),
            tokio::spawn(every(
                self.lane.clone(),
                self.schedule.backup_interval,
                || LaneMessage::DetectPending,
            )),
            tokio::spawn(every(
                self.lane.clone(),
                self.schedule.cleanup_interval,
                || LaneMessage::Cleanup,
            )),
        ];

        self.active = Some(Monitor {
            _watcher: watcher,
            tasks,
        });
        log::info!("Monitoring {}", self.inbox.display());

        Ok(())
    }

    /// Cancels the subscription and timers. Work already queued on the lane
    /// still runs. Idempotent.
    pub fn stop(&mut self) {
        let Some(monitor) = self.active.take() else {
            return;
        };

        for task in &monitor.tasks {
            task.abort();
        }
        drop(monitor);

        if self.lane.send(LaneMessage::Monitoring(false)).is_err() {
            log::debug!("Lane already closed while stopping");
        }
        log::info!("Stopped monitoring {}", self.inbox.display());
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn watch_failed(path: &Path, err: notify::Error) -> TidyError {
    TidyError::WatchSetupFailed {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Turns bursts of change notifications into one new-file scan per settle
/// window.
async fn settle_changes(
    mut changes: mpsc::UnboundedReceiver<()>,
    lane: ServiceHandle,
    delay: Duration,
) {
    while changes.recv().await.is_some() {
        tokio::time::sleep(delay).await;
        while changes.try_recv().is_ok() {}

        if lane.send(LaneMessage::DetectNew).is_err() {
            break;
        }
    }
}

async fn every(lane: ServiceHandle, period: Duration, message: fn() -> LaneMessage) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;
        if lane.send(message()).is_err() {
            break;
        }
    }
}
