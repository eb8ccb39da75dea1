//! User-facing notification sink.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        f.write_str(label)
    }
}

/// Fire-and-forget sink for success/error/warning messages, typically a
/// toast system.
pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}

/// Writes notifications to the log instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Success => tracing::info!("Notification: {}", message),
            Severity::Warning => tracing::warn!("Notification: {}", message),
            Severity::Error => tracing::error!("Notification: {}", message),
        }
    }
}
