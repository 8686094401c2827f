use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use dialoguer::Confirm;
use tidy_lib::util::format::format_timestamp;
use tidy_lib::{ActivityDatabase, ActivityEntry, ActivityFilter, LogAction, Result, SqliteDatabase};

pub fn handle_log_command(
    db: &mut SqliteDatabase,
    limit: u32,
    action: Option<String>,
    json: bool,
    clear: bool,
) -> Result<()> {
    if clear {
        return clear_log(db);
    }

    let filter = ActivityFilter {
        action: action.as_deref().map(LogAction::from_str).transpose()?,
        limit: Some(limit),
        ..Default::default()
    };
    let entries = db.query_log(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", style("No activity recorded").yellow());
        return Ok(());
    }

    println!(
        "\n{} ({} entries)\n",
        style("Activity Log").bold().cyan(),
        entries.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("Action").fg(Color::Cyan),
        Cell::new("File").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Details").fg(Color::Cyan),
    ]);

    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(format_timestamp(&entry.timestamp)),
            Cell::new(entry.action.as_str()).fg(action_color(entry.action)),
            Cell::new(&entry.file_name),
            Cell::new(entry.category.display_name()),
            Cell::new(describe(entry)),
        ]);
    }

    println!("{}", table);
    println!(
        "\n{}",
        style("Revert a move with `tidy revert <ID>`").dim()
    );

    Ok(())
}

fn clear_log(db: &mut SqliteDatabase) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Delete the entire activity log?")
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", style("Cancelled").yellow());
        return Ok(());
    }

    let removed = db.clear_log()?;
    println!("{} Removed {} log entries", style("✓").green(), removed);
    Ok(())
}

fn action_color(action: LogAction) -> Color {
    match action {
        LogAction::Moved | LogAction::Cleaned => Color::Green,
        LogAction::Error => Color::Red,
        LogAction::Pending => Color::Yellow,
        LogAction::Reverted => Color::Magenta,
        LogAction::Tracked | LogAction::Mounted | LogAction::Launched => Color::Blue,
    }
}

fn describe(entry: &ActivityEntry) -> String {
    match (&entry.destination_path, &entry.details) {
        (Some(dest), Some(details)) => format!("{} -> {}", details, dest),
        (Some(dest), None) => format!("-> {}", dest),
        (None, Some(details)) => details.clone(),
        (None, None) => "-".to_string(),
    }
}
