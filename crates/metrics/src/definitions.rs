//! Metric name and label definitions.
//!
//! All metric names used by the parley crates live here so that dashboards
//! have a single place to look.

/// Protocol registry metrics
pub mod protocols {
    /// Number of protocols registered with the application context
    pub const REGISTERED: &str = "parley_protocols_registered";
}

/// Account metrics
pub mod accounts {
    /// Number of accounts currently owned by a protocol
    pub const REGISTERED: &str = "parley_accounts_registered";
    /// Total number of account status transitions
    pub const STATUS_CHANGES_TOTAL: &str = "parley_account_status_changes_total";
    /// Total number of capability lookups that fell through to the menu controller
    pub const CAPABILITY_FALLBACKS_TOTAL: &str = "parley_account_capability_fallbacks_total";
}

/// Group chat manager registry metrics
pub mod group_chat {
    /// Number of group chat managers in the registry
    pub const MANAGERS_REGISTERED: &str = "parley_group_chat_managers_registered";
    /// Attachments made while another manager was still attached
    pub const ATTACH_CONFLICTS_TOTAL: &str = "parley_group_chat_attach_conflicts_total";
}

/// Notification metrics
pub mod notifications {
    /// Total notifications handed to the sink
    pub const SENT_TOTAL: &str = "parley_notifications_sent_total";
}

/// Common label keys
pub mod labels {
    pub const PROTOCOL: &str = "protocol";
    pub const REASON: &str = "reason";
    pub const KIND: &str = "kind";
}
