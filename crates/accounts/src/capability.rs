//! Identifier-addressed capabilities.
//!
//! Generic code asks an account for a capability by [`CapabilityId`] and
//! gets a typed handle back, without knowing which protocol it talks to.
//! Accounts answer the well-known ids themselves and hand everything else
//! to their [`MenuController`](crate::MenuController).

use std::{any::Any, borrow::Cow, fmt, sync::Arc};

use crate::{ChatUnit, GroupChatManager};

/// Stable capability identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(Cow<'static, str>);

impl CapabilityId {
    pub const CONTACTS_FACTORY: CapabilityId =
        CapabilityId(Cow::Borrowed("org.parley.ContactsFactory"));
    pub const GROUP_CHAT_MANAGER: CapabilityId =
        CapabilityId(Cow::Borrowed("org.parley.GroupChatManager"));
    pub const INFO_REQUEST_FACTORY: CapabilityId =
        CapabilityId(Cow::Borrowed("org.parley.InfoRequestFactory"));

    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Looks up or creates contacts by protocol id.
pub trait ContactsFactory: Send + Sync {
    fn contact(&self, id: &str, create: bool) -> Option<Arc<dyn ChatUnit>>;
}

/// How far an info request for a unit is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportLevel {
    NotSupported,
    /// Supported in principle but not right now (e.g. offline).
    Unavailable,
    ReadOnly,
    ReadWrite,
}

/// Creates vCard-style info requests.
pub trait InfoRequestFactory: Send + Sync {
    /// `None` asks about the account's own info.
    fn support_level(&self, unit: Option<&dyn ChatUnit>) -> SupportLevel;
}

/// A resolved capability handle.
#[derive(Clone)]
pub enum Capability {
    GroupChatManager(Arc<dyn GroupChatManager>),
    ContactsFactory(Arc<dyn ContactsFactory>),
    InfoRequestFactory(Arc<dyn InfoRequestFactory>),
    /// Anything registered under a custom id.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Capability {
    pub fn as_group_chat_manager(&self) -> Option<&Arc<dyn GroupChatManager>> {
        match self {
            Self::GroupChatManager(manager) => Some(manager),
            _ => None,
        }
    }

    pub fn as_contacts_factory(&self) -> Option<&Arc<dyn ContactsFactory>> {
        match self {
            Self::ContactsFactory(factory) => Some(factory),
            _ => None,
        }
    }

    pub fn as_info_request_factory(&self) -> Option<&Arc<dyn InfoRequestFactory>> {
        match self {
            Self::InfoRequestFactory(factory) => Some(factory),
            _ => None,
        }
    }

    /// Concrete handle behind a `Custom` capability.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Custom(any) => Arc::clone(any).downcast::<T>().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::GroupChatManager(_) => "GroupChatManager",
            Self::ContactsFactory(_) => "ContactsFactory",
            Self::InfoRequestFactory(_) => "InfoRequestFactory",
            Self::Custom(_) => "Custom",
        };
        f.debug_tuple(kind).finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct Whiteboard {
        pages: u32,
    }

    #[test]
    fn custom_capability_downcasts() {
        let capability = Capability::Custom(Arc::new(Whiteboard { pages: 3 }));
        assert_eq!(capability.downcast::<Whiteboard>().unwrap().pages, 3);
        assert!(capability.downcast::<String>().is_none());
        assert!(capability.as_group_chat_manager().is_none());
    }

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(
            CapabilityId::new("org.parley.GroupChatManager"),
            CapabilityId::GROUP_CHAT_MANAGER
        );
        assert_eq!(
            CapabilityId::new(String::from("x.y")).to_string(),
            "x.y"
        );
    }
}
