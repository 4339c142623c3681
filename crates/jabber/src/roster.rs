//! Contact list of one account.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use {
    parley_accounts::{ChatUnit, ContactsFactory},
    tracing::debug,
};

use crate::Jid;

/// A roster entry, addressed by its bare JID.
#[derive(Debug)]
pub struct JabberContact {
    jid: Jid,
    id: String,
    name: RwLock<Option<String>>,
}

impl JabberContact {
    /// `jid` is reduced to its bare form.
    pub fn new(jid: Jid) -> Self {
        let jid = jid.bare();
        let id = jid.to_string();
        Self {
            jid,
            id,
            name: RwLock::new(None),
        }
    }

    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    pub fn set_name(&self, name: Option<String>) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name;
    }
}

impl ChatUnit for JabberContact {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Contacts keyed by bare JID. Serves as the account's
/// [`ContactsFactory`] capability.
#[derive(Debug, Default)]
pub struct JabberRoster {
    contacts: RwLock<HashMap<Jid, Arc<JabberContact>>>,
}

impl JabberRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, jid: &Jid) -> Option<Arc<JabberContact>> {
        self.contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&jid.bare())
            .cloned()
    }

    /// Existing contact for `jid`, or a newly inserted one.
    pub fn get_or_insert(&self, jid: &Jid) -> Arc<JabberContact> {
        let bare = jid.bare();
        let mut contacts = self.contacts.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(contacts.entry(bare.clone()).or_insert_with(|| {
            debug!(contact = %bare, "roster contact created");
            Arc::new(JabberContact::new(bare))
        }))
    }

    pub fn remove(&self, jid: &Jid) -> Option<Arc<JabberContact>> {
        self.contacts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&jid.bare())
    }

    pub fn len(&self) -> usize {
        self.contacts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContactsFactory for JabberRoster {
    fn contact(&self, id: &str, create: bool) -> Option<Arc<dyn ChatUnit>> {
        let jid = match Jid::parse(id) {
            Ok(jid) => jid,
            Err(e) => {
                debug!(%id, error = %e, "contact lookup with invalid JID");
                return None;
            },
        };
        let contact = if create {
            Some(self.get_or_insert(&jid))
        } else {
            self.get(&jid)
        };
        contact.map(|c| c as Arc<dyn ChatUnit>)
    }
}
