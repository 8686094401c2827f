mod common;

use common::{enabled, TestInbox};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tidy_lib::{
    connect_or_lock, spawn_lane, Category, Connection, ControlClient, ControlServer,
    OrganizerControl, Preferences, ServiceLock, TidyError,
};

struct StateDir {
    dir: TempDir,
}

impl StateDir {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn socket(&self) -> PathBuf {
        self.dir.path().join("tidy.db.sock")
    }

    fn lock(&self) -> PathBuf {
        self.dir.path().join("tidy.db.lock")
    }
}

/// Runs blocking client work off the runtime so the server can answer.
async fn with_client<T, F>(socket: PathBuf, work: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&mut ControlClient) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut client = ControlClient::connect(&socket)
            .unwrap()
            .expect("watcher is listening");
        work(&mut client)
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commands_run_on_the_watcher_lane() {
    let inbox = TestInbox::new().unwrap();
    let state = StateDir::new();
    inbox.touch("a.pdf");
    inbox.touch("b.png");

    let _watcher_lock = ServiceLock::try_acquire(&state.lock()).unwrap();
    let lane = spawn_lane(inbox.organizer(enabled()).unwrap()).unwrap();
    let handle = lane.handle();
    let server = ControlServer::start(&state.socket(), handle.clone()).unwrap();

    let outcome = with_client(state.socket(), |client| client.scan_now().unwrap()).await;
    assert_eq!(outcome.moved, 2);
    assert!(inbox.path().join("Documents/a.pdf").exists());
    assert_eq!(handle.status().total_moved, 2);

    let status = with_client(state.socket(), |client| client.status().unwrap()).await;
    assert_eq!(status.total_moved, 2);

    let reverted = with_client(state.socket(), |client| client.revert_recent(30).unwrap()).await;
    assert_eq!(reverted.reverted, 2);
    assert!(inbox.path().join("a.pdf").exists());

    drop(server);
    assert!(!state.socket().exists());
    lane.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pending_file_and_errors_over_socket() {
    let inbox = TestInbox::new().unwrap();
    let state = StateDir::new();
    let photo = inbox.touch("photo.jpg");
    let stray = inbox.path().join("never-seen.pdf");

    let lane = spawn_lane(inbox.organizer(Preferences::default()).unwrap()).unwrap();
    let server = ControlServer::start(&state.socket(), lane.handle()).unwrap();

    let (refreshed, destination, missing) = with_client(state.socket(), move |client| {
        let refreshed = client.refresh().unwrap();
        let destination = client.organize_file(&photo).unwrap();
        let missing = client.organize_file(&stray);
        (refreshed, destination, missing)
    })
    .await;

    assert_eq!(refreshed.pending, 1);
    assert_eq!(destination, inbox.path().join("Images/photo.jpg"));
    assert!(matches!(missing, Err(TidyError::Remote(message)) if message.contains("never-seen.pdf")));

    drop(server);
    lane.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_signals_are_queued_on_the_lane() {
    let inbox = TestInbox::new().unwrap();
    let state = StateDir::new();
    let image = inbox.touch("Tool.dmg");

    let lane = spawn_lane(inbox.organizer(enabled()).unwrap()).unwrap();
    let handle = lane.handle();
    handle.scan_now().await.unwrap();
    assert_eq!(handle.status().tracked_installers, 1);
    let server = ControlServer::start(&state.socket(), handle.clone()).unwrap();

    let queued = with_client(state.socket(), move |client| client.volume_mounted(&image).unwrap())
        .await;
    assert!(queued.is_none());

    // Replies come back in order, so the mount has been handled by now.
    handle.refresh().await.unwrap();
    assert!(inbox.path().join("Junk Installers/Tool.dmg").exists());
    assert_eq!(handle.status().tracked_installers, 0);

    drop(server);
    lane.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_categories_while_watching() {
    let inbox = TestInbox::new().unwrap();
    let state = StateDir::new();
    let table = state.dir.path().join("categories.toml");
    fs::write(&table, "[categories]\ndocument = [\"pdf\"]\n").unwrap();

    let organizer = inbox
        .organizer(enabled())
        .unwrap()
        .with_categories_file(Some(table.clone()))
        .unwrap();
    let lane = spawn_lane(organizer).unwrap();
    let server = ControlServer::start(&state.socket(), lane.handle()).unwrap();

    fs::write(&table, "[categories]\ndocument = [\"pdf\", \"xyz\"]\n").unwrap();
    with_client(state.socket(), |client| client.reload_categories().unwrap()).await;

    inbox.touch("notes.xyz");
    let outcome = lane.handle().scan_now().await.unwrap();
    assert_eq!(outcome.moved, 1);
    assert!(inbox
        .path()
        .join(Category::Document.default_folder())
        .join("notes.xyz")
        .exists());

    drop(server);
    lane.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_process_forwards_instead_of_moving() {
    let inbox = TestInbox::new().unwrap();
    let state = StateDir::new();

    let watcher_lock = ServiceLock::try_acquire(&state.lock()).unwrap();
    let lane = spawn_lane(inbox.organizer(enabled()).unwrap()).unwrap();
    let server = ControlServer::start(&state.socket(), lane.handle()).unwrap();

    let (socket, lock) = (state.socket(), state.lock());
    let remote = tokio::task::spawn_blocking(move || {
        matches!(connect_or_lock(&socket, &lock), Ok(Connection::Remote(_)))
    })
    .await
    .unwrap();
    assert!(remote);

    // Lock held but nobody answering: refuse rather than race the owner.
    drop(server);
    assert!(matches!(
        connect_or_lock(&state.socket(), &state.lock()),
        Err(TidyError::ServiceBusy(_))
    ));

    drop(watcher_lock);
    lane.shutdown().await.unwrap();
    assert!(matches!(
        connect_or_lock(&state.socket(), &state.lock()),
        Ok(Connection::Local(_))
    ));
}
