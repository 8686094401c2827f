use console::style;
use tidy_lib::util::format::display_path;
use tidy_lib::{
    spawn_lane, Config, ControlServer, PreferenceStore, Result, ScheduleConfig, ServiceLock,
    StatusSnapshot, TidyError, TomlPreferences, Watcher,
};

pub fn handle_watch_command(config: &Config, quiet: bool) -> Result<()> {
    if !config.inbox.is_dir() {
        return Err(TidyError::InboxUnavailable(config.inbox.clone()));
    }

    // While held, other commands forward their work to this process.
    let _lock = ServiceLock::try_acquire(&config.lock_path)?;

    let store = TomlPreferences::new(&config.prefs_path);
    let mut prefs = store.load()?;
    if !prefs.enabled {
        prefs.enabled = true;
        store.save(&prefs)?;
    }

    let organizer = super::init_organizer(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let lane = spawn_lane(organizer)?;
        let handle = lane.handle();

        let mut watcher = Watcher::new(&config.inbox, handle.clone(), ScheduleConfig::default());
        watcher.start()?;
        let server = ControlServer::start(&config.socket_path, handle.clone())?;

        if !quiet {
            println!(
                "{} Watching {} (Ctrl-C to stop)",
                style(">>>").cyan(),
                display_path(&config.inbox)
            );
        }

        let mut status = handle.subscribe();
        let mut last = status.borrow().clone();

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        log::warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                    break;
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        log::error!("Organizer lane exited unexpectedly");
                        break;
                    }
                    let current = status.borrow_and_update().clone();
                    if !quiet {
                        report_change(&last, &current);
                    }
                    last = current;
                }
            }
        }

        drop(server);
        watcher.stop();
        lane.shutdown().await?;

        if !quiet {
            println!("{} Stopped", style("✓").green());
        }
        Ok::<(), TidyError>(())
    })
}

fn report_change(previous: &StatusSnapshot, current: &StatusSnapshot) {
    if current.total_moved > previous.total_moved {
        println!(
            "  {} organized {} file(s) ({} total)",
            style("+").green(),
            current.total_moved - previous.total_moved,
            current.total_moved
        );
    }
    if current.pending != previous.pending {
        println!("  {} pending: {}", style("·").dim(), current.pending);
    }
    if current.last_error != previous.last_error {
        if let Some(err) = &current.last_error {
            println!("  {} {}", style("!").red(), err);
        }
    }
}
