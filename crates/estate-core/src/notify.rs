//! Blocking user notifications.

use std::sync::Mutex;

/// A notification that was raised to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

/// Trait for surfacing blocking notifications to the user.
///
/// Implement this trait to integrate with your dialog/toast system.
/// The session layer decides when to alert; your app renders it.
pub trait Notifier: Send + Sync {
    /// Show a blocking notification.
    fn alert(&self, title: &str, message: &str);
}

/// Notifier that writes alerts to the log instead of a dialog.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn alert(&self, title: &str, message: &str) {
        tracing::warn!(title, "{message}");
    }
}

/// Notifier that keeps every alert in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts raised so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    /// Number of alerts raised so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.alerts.lock().map(|alerts| alerts.len()).unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, title: &str, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(Alert {
                title: title.to_owned(),
                message: message.to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.alert("Error", "first");
        notifier.alert("Success", "second");

        let alerts = notifier.alerts();
        assert_eq!(notifier.count(), 2);
        assert_eq!(alerts[0].message, "first");
        assert_eq!(alerts[1].title, "Success");
    }
}
