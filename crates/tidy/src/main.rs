mod cli;

use clap::Parser;
use tidy_lib::Result;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli::init_config(&cli)?;
    let quiet = cli.quiet;

    match cli.command {
        cli::Commands::Watch => cli::watch::handle_watch_command(&config, quiet),

        cli::Commands::Scan => {
            let mut session = cli::open_session(&config)?;
            cli::scan::handle_scan_command(&mut session, &config.inbox, quiet)
        }

        cli::Commands::Pending { organize, refresh, file } => {
            cli::pending::handle_pending_command(&config, organize, refresh, file, quiet)
        }

        cli::Commands::Revert { id, recent, minutes, all, yes } => {
            let mut session = cli::open_session(&config)?;
            cli::revert::handle_revert_command(&mut session, id, recent, minutes, all, yes, quiet)
        }

        cli::Commands::Status { json } => cli::status::handle_status_command(&config, json),

        cli::Commands::Log { limit, action, json, clear } => {
            let mut db = cli::init_database(&config)?;
            cli::activity::handle_log_command(&mut db, limit, action, json, clear)
        }

        cli::Commands::Installers { sweep } => {
            cli::installers::handle_installers_command(&config, sweep, quiet)
        }

        cli::Commands::Signal { event } => {
            cli::installers::handle_signal_command(&config, event, quiet)
        }

        cli::Commands::Config { action } => cli::config::handle_config_command(&config, action),

        cli::Commands::Categories { reload } => {
            cli::config::handle_categories_command(&config, reload)
        }
    }
}
