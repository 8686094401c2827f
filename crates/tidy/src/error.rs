use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Destination unavailable: {path}{}", fmt_hint(.hint))]
    DestinationUnavailable {
        path: PathBuf,
        hint: Option<String>,
    },

    #[error("Source vanished before it could be moved: {0}")]
    SourceVanished(PathBuf),

    #[error("Failed to move {path}: {source}")]
    MoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File no longer exists at destination: {0}")]
    DestinationFileMissing(PathBuf),

    #[error("Failed to watch {path}: {message}")]
    WatchSetupFailed { path: PathBuf, message: String },

    #[error("Inbox directory is not available: {0}")]
    InboxUnavailable(PathBuf),

    #[error("No free name for {path} after {limit} attempts")]
    UniqueNameExhausted { path: PathBuf, limit: u32 },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Organizer lane is not running")]
    LaneClosed,

    #[error("Another tidy process is working on this inbox (lock: {0})")]
    ServiceBusy(PathBuf),

    #[error("Watcher rejected the request: {0}")]
    Remote(String),

    #[error("Unexpected control response: {0}")]
    Protocol(String),

    #[error("User input error: {0}")]
    UserInput(String),
}

fn fmt_hint(hint: &Option<String>) -> String {
    hint.as_deref()
        .map(|h| format!(" ({})", h))
        .unwrap_or_default()
}

impl TidyError {
    /// Errors that are dropped without surfacing to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, TidyError::SourceVanished(_))
    }
}

impl From<dialoguer::Error> for TidyError {
    fn from(err: dialoguer::Error) -> Self {
        TidyError::UserInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TidyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_hint_in_message() {
        let err = TidyError::DestinationUnavailable {
            path: PathBuf::from("/home/me/Documents"),
            hint: Some("choose a custom destination".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Destination unavailable: /home/me/Documents (choose a custom destination)"
        );

        let bare = TidyError::DestinationUnavailable {
            path: PathBuf::from("/srv/out"),
            hint: None,
        };
        assert_eq!(bare.to_string(), "Destination unavailable: /srv/out");
    }

    #[test]
    fn test_only_vanished_source_is_silent() {
        assert!(TidyError::SourceVanished(PathBuf::from("/tmp/a.pdf")).is_silent());
        assert!(!TidyError::DestinationFileMissing(PathBuf::from("/tmp/a.pdf")).is_silent());
    }
}
