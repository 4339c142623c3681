//! Jabber/XMPP account type built on the account core.
//!
//! Provides the protocol-specific pieces an XMPP account plugs into
//! [`parley_accounts::Account`]: JID handling, the account parameter
//! schema, per-resource session routing, a roster-backed contacts factory
//! and conference bookkeeping. No network transport lives here.

pub mod config;
pub mod error;
pub mod group_chat;
pub mod jid;
pub mod parameters;
pub mod protocol;
pub mod roster;
pub mod session;

pub use {
    config::JabberSettings,
    error::{Error, Result},
    group_chat::{JabberGroupChatManager, JoinedRoom},
    jid::Jid,
    parameters::JabberParameters,
    protocol::{JabberAccount, JabberProtocol, PROTOCOL_ID},
    roster::{JabberContact, JabberRoster},
    session::{JabberResource, JabberSessionRouter},
};
