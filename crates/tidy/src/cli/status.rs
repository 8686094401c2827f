use super::{init_database, init_organizer};
use chrono::Utc;
use console::style;
use tidy_lib::util::format::{display_path, format_age};
use tidy_lib::{
    ActivityDatabase, ActivityFilter, Config, ControlClient, LogAction, OrganizerControl, Result,
    RECENT_WINDOW_MINUTES,
};

pub fn handle_status_command(config: &Config, json: bool) -> Result<()> {
    // Reading status never needs the service lock.
    let snapshot = match ControlClient::connect(&config.socket_path)? {
        Some(mut client) => client.status()?,
        None => init_organizer(config)?.status_snapshot()?,
    };

    // The snapshot only knows errors from its own process; report the latest
    // logged one instead.
    let last_error = init_database(config)?
        .query_log(&ActivityFilter {
            action: Some(LogAction::Error),
            limit: Some(1),
            ..Default::default()
        })?
        .into_iter()
        .next();

    if json {
        let mut value = serde_json::to_value(&snapshot)?;
        if let (Some(entry), Some(map)) = (&last_error, value.as_object_mut()) {
            map.insert("last_error".to_string(), serde_json::to_value(entry)?);
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("\n{}", style("Tidy Status").bold().cyan());
    println!("{}\n", style("═".repeat(60)).dim());

    println!("{}", style("Inbox").bold());
    println!("  Path: {}", display_path(&config.inbox));
    if snapshot.monitoring {
        println!("  Watcher: {}", style("running").green());
    } else {
        println!("  Watcher: {}", style("not running").dim());
    }
    if snapshot.enabled {
        println!("  Auto-organize: {}", style("enabled").green());
    } else {
        println!("  Auto-organize: {}", style("disabled").yellow());
    }
    println!();

    println!("{}", style("Files").bold());
    println!("  Pending: {}", style(snapshot.pending).yellow());
    println!(
        "  Moved (last {} min): {}",
        RECENT_WINDOW_MINUTES,
        style(snapshot.recent_moves).cyan()
    );
    println!("  Moved (all): {}", style(snapshot.total_moved).cyan());
    println!(
        "  Tracked installers: {}",
        style(snapshot.tracked_installers).cyan()
    );
    println!();

    if let Some(entry) = last_error {
        println!("{}", style("Last Error").bold());
        println!(
            "  {} ({} ago)",
            style(&entry.file_name).red(),
            format_age(&entry.timestamp, &Utc::now())
        );
        if let Some(details) = &entry.details {
            println!("  {}", details);
        }
        println!();
    }

    Ok(())
}
