use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

/// Category of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    IncomingMessage,
    OutgoingMessage,
    UserOnline,
    UserOffline,
    UserChangedStatus,
    Attention,
    System,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncomingMessage => "incoming_message",
            Self::OutgoingMessage => "outgoing_message",
            Self::UserOnline => "user_online",
            Self::UserOffline => "user_offline",
            Self::UserChangedStatus => "user_changed_status",
            Self::Attention => "attention",
            Self::System => "system",
        }
    }
}

/// A notification handed to a [`NotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl NotificationRequest {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            text: String::new(),
            title: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Fire-and-forget delivery of notifications (popups, sounds, tray).
///
/// Delivery failures are the sink's concern; callers never observe them.
pub trait NotificationSink: Send + Sync {
    fn send(&self, request: NotificationRequest);
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn send(&self, request: NotificationRequest) {
        debug!(kind = request.kind.as_str(), text = %request.text, "notification dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let request = NotificationRequest::new(NotificationKind::System)
            .with_text("Authorization failed")
            .with_title("alice@example.com");
        assert_eq!(request.kind, NotificationKind::System);
        assert_eq!(request.text, "Authorization failed");
        assert_eq!(request.title.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn null_sink_accepts_anything() {
        NullNotificationSink.send(NotificationRequest::new(NotificationKind::Attention));
    }
}
