//! Operator-facing notifications (the console's "toasts").

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification { level: Level::Success, message: message.to_string() });
    }

    fn info(&self, message: &str) {
        self.notify(Notification { level: Level::Info, message: message.to_string() });
    }

    fn error(&self, message: &str) {
        self.notify(Notification { level: Level::Error, message: message.to_string() });
    }
}

/// Keeps every notification; used by the terminal front-end and tests
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.entries.lock().push(notification);
    }
}
