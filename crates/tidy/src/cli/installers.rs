use super::helpers::{print_outcome, print_route};
use super::{init_database, open_session};
use chrono::Utc;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use std::path::PathBuf;
use tidy_lib::util::format::{display_path, format_age};
use tidy_lib::util::progress::create_spinner;
use tidy_lib::{Config, InstallerDatabase, PreferenceStore, Result, TomlPreferences};

#[derive(Subcommand)]
pub enum SignalCommands {
    #[command(about = "A disk image was mounted")]
    Mounted {
        #[arg(help = "Path of the mounted image file")]
        path: PathBuf,
    },

    #[command(about = "An application was launched")]
    Launched {
        #[arg(help = "Path of the launched application")]
        path: PathBuf,
    },
}

pub fn handle_installers_command(config: &Config, sweep: bool, quiet: bool) -> Result<()> {
    if sweep {
        let mut session = open_session(config)?;
        if !quiet {
            print_route(&session);
        }
        let spinner = create_spinner("Cleaning unused installers...");
        let outcome = session.control.cleanup_sweep();
        spinner.finish_and_clear();
        print_outcome(&outcome?, quiet);
        return Ok(());
    }

    let installers = init_database(config)?.list_installers()?;
    if installers.is_empty() {
        println!("{}", style("No installers tracked").green());
        return Ok(());
    }

    let prefs = TomlPreferences::new(&config.prefs_path).load()?;
    let now = Utc::now();

    println!(
        "\n{} ({} installers)\n",
        style("Tracked Installers").bold().cyan(),
        installers.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Kind").fg(Color::Cyan),
        Cell::new("Age").fg(Color::Cyan),
        Cell::new("Used").fg(Color::Cyan),
    ]);

    for entry in &installers {
        let used = match entry.used_at {
            Some(at) => Cell::new(format!("{} ago", format_age(&at, &now))).fg(Color::Green),
            None => Cell::new("No"),
        };
        table.add_row(vec![
            Cell::new(&entry.name),
            Cell::new(entry.kind.as_str()),
            Cell::new(format_age(&entry.first_seen, &now)),
            used,
        ]);
    }

    println!("{}", table);

    if prefs.auto_clean_unused_installers {
        println!(
            "\n{}",
            style(format!(
                "Unused installers are moved after {} days",
                prefs.auto_clean_days
            ))
            .dim()
        );
    }

    Ok(())
}

pub fn handle_signal_command(config: &Config, event: SignalCommands, quiet: bool) -> Result<()> {
    let mut session = open_session(config)?;
    let handled = match &event {
        SignalCommands::Mounted { path } => session.control.volume_mounted(path)?,
        SignalCommands::Launched { path } => session.control.app_launched(path)?,
    };
    let path = match &event {
        SignalCommands::Mounted { path } | SignalCommands::Launched { path } => path,
    };

    let Some(outcome) = handled else {
        if !quiet {
            println!(
                "{} Queued {} on the running watcher",
                style("✓").green(),
                display_path(path)
            );
        }
        return Ok(());
    };

    if !quiet && outcome.used == 0 {
        println!(
            "{}",
            style(format!("No tracked installer matches {}", display_path(path))).dim()
        );
        return Ok(());
    }

    print_outcome(&outcome, quiet);
    Ok(())
}
