pub mod activity;
pub mod config;
mod helpers;
pub mod installers;
pub mod pending;
pub mod revert;
pub mod scan;
pub mod status;
pub mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tidy_lib::{
    connect_or_lock, Config, ConfirmationSource, Connection, Database, Decision, DialogConfirm,
    FixedDecision, Organizer, OrganizerControl, Result, ServiceLock, SqliteDatabase,
    TomlPreferences,
};

#[derive(Parser)]
#[command(name = "tidy")]
#[command(about = "Keeps a downloads folder organized by file type", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to database file")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to preferences file")]
    pub prefs: Option<PathBuf>,

    #[arg(long, global = true, help = "Inbox directory to organize (default: ~/Downloads)")]
    pub inbox: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'q', global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Watch the inbox and organize new files until interrupted")]
    Watch,

    #[command(about = "Classify and move every file currently in the inbox")]
    Scan,

    #[command(about = "List or organize files waiting in the inbox")]
    Pending {
        #[arg(long, help = "Move every pending file to its destination")]
        organize: bool,

        #[arg(long, help = "Rebuild pending records and flag moves whose file disappeared")]
        refresh: bool,

        #[arg(long, help = "Organize a single pending file")]
        file: Option<PathBuf>,
    },

    #[command(about = "Move organized files back into the inbox")]
    Revert {
        #[arg(help = "Activity log id of the move to revert")]
        id: Option<i64>,

        #[arg(long, help = "Revert moves from the last few minutes")]
        recent: bool,

        #[arg(long, default_value_t = tidy_lib::RECENT_WINDOW_MINUTES, help = "Window for --recent, in minutes")]
        minutes: i64,

        #[arg(long, help = "Revert every organized file")]
        all: bool,

        #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Show organizer status")]
    Status {
        #[arg(long, help = "Print status as JSON")]
        json: bool,
    },

    #[command(about = "Show the activity log")]
    Log {
        #[arg(long, short = 'n', default_value_t = 50, help = "Maximum number of entries")]
        limit: u32,

        #[arg(long, help = "Only show entries with this action (moved, pending, error, ...)")]
        action: Option<String>,

        #[arg(long, help = "Print entries as JSON")]
        json: bool,

        #[arg(long, help = "Delete every log entry")]
        clear: bool,
    },

    #[command(about = "List tracked installers")]
    Installers {
        #[arg(long, help = "Move unused installers older than the configured age")]
        sweep: bool,
    },

    #[command(about = "Report an installer lifecycle event")]
    Signal {
        #[command(subcommand)]
        event: installers::SignalCommands,
    },

    #[command(about = "Show or edit preferences")]
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },

    #[command(about = "Show the extension table used for classification")]
    Categories {
        #[arg(long, help = "Ask the running watcher to re-read the extension table")]
        reload: bool,
    },
}

pub fn init_config(cli: &Cli) -> Result<Config> {
    let config = Config::new(cli.db.clone(), cli.prefs.clone(), cli.inbox.clone())?;
    config.ensure_db_directory()?;
    Ok(config)
}

pub fn init_database(config: &Config) -> Result<SqliteDatabase> {
    let mut db = SqliteDatabase::open(&config.db_path)?;
    db.initialize()?;

    Ok(db)
}

/// Wires an organizer for this process. Prompts are only shown when a user is
/// at the terminal; otherwise files that need confirmation are skipped.
pub fn init_organizer(config: &Config) -> Result<Organizer<SqliteDatabase>> {
    let db = init_database(config)?;
    let prefs = Box::new(TomlPreferences::new(&config.prefs_path));

    let confirm: Box<dyn ConfirmationSource> = if console::user_attended() {
        Box::new(DialogConfirm)
    } else {
        Box::new(FixedDecision(Decision::Skip))
    };

    Ok(Organizer::new(db, &config.inbox, prefs)?
        .with_categories_file(config.categories_path.clone())?
        .with_confirmation(confirm))
}

/// Where a mutating command runs: on a running watcher's lane, or in this
/// process while it holds the service lock.
pub struct Session {
    pub control: Box<dyn OrganizerControl>,
    lock: Option<ServiceLock>,
}

impl Session {
    pub fn is_remote(&self) -> bool {
        self.lock.is_none()
    }
}

pub fn open_session(config: &Config) -> Result<Session> {
    match connect_or_lock(&config.socket_path, &config.lock_path)? {
        Connection::Remote(client) => Ok(Session {
            control: Box::new(client),
            lock: None,
        }),
        Connection::Local(lock) => Ok(Session {
            control: Box::new(init_organizer(config)?),
            lock: Some(lock),
        }),
    }
}
