// src/notifier.rs

//! Developer-facing notifications.
//!
//! Every task receives an `Arc<dyn Notifier>` through its context. On a
//! transformation failure the task reports through it and stops its own
//! pipeline; nothing here ends the process.

use std::fmt;
use std::io::Write;

use tracing::{error, info};

use crate::config::NotifySection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub subtitle: Option<String>,
    pub message: String,
}

impl Notification {
    /// Failure notice: fixed title, `Failure!` subtitle, `Error: <message>`.
    pub fn failure(title: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.into(),
            subtitle: Some("Failure!".to_string()),
            message: format!("Error: {error}"),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            subtitle: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.title)?;
        if let Some(subtitle) = &self.subtitle {
            write!(f, " {subtitle}")?;
        }
        write!(f, " {}", self.message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);

    /// Title used for notifications built by callers.
    fn title(&self) -> &str;

    fn failure(&self, error: &dyn fmt::Display) {
        self.notify(&Notification::failure(self.title(), error));
    }

    fn success(&self, message: &str) {
        self.notify(&Notification::success(self.title(), message));
    }
}

/// Prints notifications to stdout and mirrors them into the log.
#[derive(Debug, Clone)]
pub struct ConsoleNotifier {
    title: String,
    bell: bool,
}

impl ConsoleNotifier {
    pub fn new(title: impl Into<String>, bell: bool) -> Self {
        Self {
            title: title.into(),
            bell,
        }
    }

    pub fn from_config(section: &NotifySection) -> Self {
        Self::new(section.title.clone(), section.bell)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Failure => {
                error!(message = %notification.message, "task failure");
            }
            NotificationKind::Success => {
                info!(message = %notification.message, "task notification");
            }
        }

        let mut out = std::io::stdout().lock();
        let bell = if self.bell && notification.kind == NotificationKind::Failure {
            "\x07"
        } else {
            ""
        };
        // A closed stdout must not take a task down with it.
        let _ = writeln!(out, "{bell}{notification}");
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_notification_has_fixed_shape() {
        let n = Notification::failure("assetpipe", "bad input");
        assert_eq!(n.subtitle.as_deref(), Some("Failure!"));
        assert_eq!(n.message, "Error: bad input");
        assert_eq!(n.to_string(), "[assetpipe] Failure! Error: bad input");
    }
}
