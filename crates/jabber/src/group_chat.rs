//! Conference (MUC) bookkeeping for one account.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use {
    parley_accounts::{Account, GroupChatManager},
    tracing::{debug, info},
};

use crate::{Error, Jid, Result};

/// A joined room and the nick used in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room: Jid,
    pub nick: String,
}

/// Tracks the conferences an account has joined.
pub struct JabberGroupChatManager {
    account: Weak<Account>,
    default_nick: String,
    rooms: RwLock<Vec<JoinedRoom>>,
}

impl JabberGroupChatManager {
    /// Manager bound to `account`. Rooms joined without an explicit nick use
    /// `default_nick`.
    pub fn new(account: &Arc<Account>, default_nick: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            account: Arc::downgrade(account),
            default_nick: default_nick.into(),
            rooms: RwLock::new(Vec::new()),
        })
    }

    /// Join `room` (a bare JID). Returns `false` if already joined; the nick
    /// is then updated in place.
    pub fn join(&self, room: &Jid, nick: Option<&str>) -> Result<bool> {
        if !room.is_bare() {
            return Err(Error::invalid_jid(room.to_string(), "room JID has a resource"));
        }
        let nick = nick.unwrap_or(&self.default_nick).to_string();
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(joined) = rooms.iter_mut().find(|r| r.room == *room) {
            debug!(%room, %nick, "already joined, updating nick");
            joined.nick = nick;
            return Ok(false);
        }
        info!(%room, %nick, "joined conference");
        rooms.push(JoinedRoom {
            room: room.clone(),
            nick,
        });
        Ok(true)
    }

    pub fn leave(&self, room: &Jid) -> bool {
        let room = room.bare();
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let before = rooms.len();
        rooms.retain(|r| r.room != room);
        let left = rooms.len() != before;
        if left {
            info!(%room, "left conference");
        }
        left
    }

    pub fn is_joined(&self, room: &Jid) -> bool {
        self.nick_in(room).is_some()
    }

    pub fn nick_in(&self, room: &Jid) -> Option<String> {
        let room = room.bare();
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.room == room)
            .map(|r| r.nick.clone())
    }

    /// Whether a groupchat message from `from` (`room@service/nick`) is the
    /// server echoing our own message.
    pub fn is_own_echo(&self, from: &Jid) -> bool {
        match from.resource() {
            Some(nick) => self.nick_in(from).is_some_and(|own| own == nick),
            None => false,
        }
    }

    pub fn joined(&self) -> Vec<JoinedRoom> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl GroupChatManager for JabberGroupChatManager {
    fn account(&self) -> Option<Arc<Account>> {
        self.account.upgrade()
    }

    fn rooms(&self) -> Vec<String> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.room.to_string())
            .collect()
    }
}

impl std::fmt::Debug for JabberGroupChatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JabberGroupChatManager")
            .field("default_nick", &self.default_nick)
            .field("rooms", &self.rooms().len())
            .finish_non_exhaustive()
    }
}
