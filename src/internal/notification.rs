use std::time::{Duration, Instant};

/// Type of transient overlay notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    /// The brief "watched" confirmation after consuming a media item.
    Watched,
    Info,
    Error,
}

impl NotificationType {
    fn timeout(&self) -> Duration {
        match self {
            NotificationType::Watched => Duration::from_secs(2),
            NotificationType::Info => Duration::from_secs(3),
            NotificationType::Error => Duration::from_secs(10),
        }
    }
}

/// A notification message with auto-dismiss.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
    pub timestamp: Instant,
}

impl Notification {
    pub fn watched(reward: u64, first_time: bool) -> Self {
        let message = if first_time && reward > 0 {
            format!("Watched! +{} earned", format_reward(reward))
        } else {
            "Watched".to_string()
        };
        Self::new(message, NotificationType::Watched)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Info)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Error)
    }

    fn new(message: impl Into<String>, notification_type: NotificationType) -> Self {
        Self {
            message: message.into(),
            notification_type,
            timestamp: Instant::now(),
        }
    }

    /// Check if this notification should be auto-dismissed.
    pub fn should_dismiss(&self) -> bool {
        self.timestamp.elapsed() > self.notification_type.timeout()
    }
}

/// Format a minor-currency reward amount, e.g. 250 -> "2.50".
pub fn format_reward(minor_units: u64) -> String {
    format!("{}.{:02}", minor_units / 100, minor_units % 100)
}
