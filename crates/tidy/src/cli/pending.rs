use super::helpers::{print_outcome, print_route};
use super::{init_database, open_session};
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use std::path::{Path, PathBuf};
use tidy_lib::util::format::{display_path, format_age};
use tidy_lib::util::progress::create_spinner;
use tidy_lib::{
    Config, PreferenceStore, RecordFilter, RecordState, RegistryDatabase, Result,
    TomlPreferences,
};

pub fn handle_pending_command(
    config: &Config,
    organize: bool,
    refresh: bool,
    file: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    if !(refresh || organize || file.is_some()) {
        return list_pending(config);
    }

    let mut session = open_session(config)?;
    if !quiet {
        print_route(&session);
    }

    if refresh {
        let spinner = create_spinner("Refreshing pending files...");
        let outcome = session.control.refresh();
        spinner.finish_and_clear();
        print_outcome(&outcome?, quiet);
    }

    if let Some(path) = file {
        let path = resolve_in_inbox(&config.inbox, path);
        let destination = session.control.organize_file(&path)?;
        if !quiet {
            println!(
                "{} Moved {} to {}",
                style("✓").green(),
                display_path(&path),
                display_path(&destination)
            );
        }
        return Ok(());
    }

    if organize {
        if !quiet {
            println!("{} Organizing all pending files...", style(">>>").cyan());
        }
        let outcome = session.control.organize_all_pending()?;
        print_outcome(&outcome, quiet);
    }

    Ok(())
}

/// Bare file names are looked up in the inbox.
fn resolve_in_inbox(inbox: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() && !path.exists() {
        inbox.join(path)
    } else {
        path
    }
}

fn list_pending(config: &Config) -> Result<()> {
    let db = init_database(config)?;
    let pending = db.query_records(&RecordFilter::state(RecordState::Pending))?;

    if pending.is_empty() {
        println!("{}", style("No pending files").green());
        return Ok(());
    }

    let prefs = TomlPreferences::new(&config.prefs_path).load()?;
    let now = Utc::now();

    println!(
        "\n{} ({} files)\n",
        style("Pending Files").bold().cyan(),
        pending.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("File").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Destination").fg(Color::Cyan),
        Cell::new("Waiting").fg(Color::Cyan),
    ]);

    for record in &pending {
        let destination = prefs.destination_for(record.category, &config.inbox);
        table.add_row(vec![
            Cell::new(&record.file_name),
            Cell::new(record.category.display_name()),
            Cell::new(display_path(&destination)),
            Cell::new(format_age(&record.discovered_at, &now)),
        ]);
    }

    println!("{}", table);
    println!(
        "\n{}",
        style("Run `tidy pending --organize` to move them").dim()
    );

    Ok(())
}
