use std::sync::Arc;

use crate::Account;

/// Anything a chat session can be opened with: a contact, a conference,
/// one resource of a contact.
pub trait ChatUnit: Send + Sync {
    /// Protocol-level identifier (e.g. a JID).
    fn id(&self) -> &str;

    fn title(&self) -> String {
        self.id().to_string()
    }
}

/// Chooses the unit a chat session should actually talk to.
///
/// The default keeps the unit unchanged; protocols with per-device
/// resources redirect a contact to its active resource.
pub trait SessionRouter: Send + Sync {
    fn unit_for_session(&self, _account: &Account, unit: Arc<dyn ChatUnit>) -> Arc<dyn ChatUnit> {
        unit
    }
}
