//! Account, protocol and capability core.
//!
//! Every wire protocol exposes its identities as [`Account`]s owned by a
//! [`Protocol`]. Protocol-specific behavior plugs in through small traits
//! ([`ParameterSchema`], [`SessionRouter`]) and identifier-addressed
//! capabilities ([`Capability`]) instead of per-protocol subclassing.
//! Process-wide state (the protocol list and the group chat manager
//! registry) lives in an explicit [`AppContext`].

pub mod account;
pub mod capability;
pub mod context;
pub mod error;
pub mod group_chat;
pub mod menu;
pub mod notification;
pub mod observer;
pub mod parameters;
pub mod protocol;
pub mod status;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    account::{Account, AccountBuilder, AccountKey},
    capability::{Capability, CapabilityId, ContactsFactory, InfoRequestFactory, SupportLevel},
    context::AppContext,
    error::{Error, Result},
    group_chat::{GroupChatManager, GroupChatManagerRegistry, RegistryObserver},
    menu::{MenuAction, MenuController},
    notification::{NotificationKind, NotificationRequest, NotificationSink, NullNotificationSink},
    observer::{AccountObserver, SubscriptionId},
    parameters::{ParameterSchema, Parameters},
    protocol::Protocol,
    status::{CHANGE_REASON_PROPERTY, ChangeReason, Status, StatusType},
    unit::{ChatUnit, SessionRouter},
};
