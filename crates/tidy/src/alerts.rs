/// Sink for desktop-style notifications.
pub trait Notifier: Send {
    fn notify(&self, title: &str, body: &str);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        log::info!("{}: {}", title, body);
    }
}
