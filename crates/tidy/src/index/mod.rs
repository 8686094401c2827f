pub mod scanner;

pub use scanner::{InboxEntry, InboxScanner, ScanOptions, ScanStats};
