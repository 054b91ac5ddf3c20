use crate::error::Error;
use crate::observer::Observer;
use std::fmt::Debug;

/// An observer that logs everything it receives.
///
/// ```
/// use stickflow::LogObserver;
///
/// let observer = LogObserver::new("south").with_level(log::Level::Info);
/// assert_eq!(observer.label(), "south");
/// ```
pub struct LogObserver {
    label: String,
    level: log::Level,
}

impl LogObserver {
    /// Logs at `Debug` level, prefixed with `[label]`.
    pub fn new(label: impl Into<String>) -> Self {
        LogObserver {
            label: label.into(),
            level: log::Level::Debug,
        }
    }

    pub fn with_level(mut self, level: log::Level) -> Self {
        self.level = level;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn level(&self) -> log::Level {
        self.level
    }
}

impl<T: Debug> Observer<T> for LogObserver {
    fn on_next(&self, value: &T) {
        log::log!(self.level, "[{}] {:?}", self.label, value);
    }

    fn on_completed(&self) {
        log::log!(self.level, "[{}] completed", self.label);
    }

    fn on_error(&self, error: &Error) {
        log::error!("[{}] {}", self.label, error);
    }
}
