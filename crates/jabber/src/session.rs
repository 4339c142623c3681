//! Per-resource session routing.
//!
//! A contact may be online from several resources at once. Chat sessions
//! opened on the bare contact are redirected to the resource that last
//! became available, so replies reach the device the contact is using.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use {
    parley_accounts::{Account, ChatUnit, SessionRouter},
    tracing::debug,
};

use crate::Jid;

/// One resource of a contact, addressed by its full JID.
#[derive(Debug, Clone)]
pub struct JabberResource {
    jid: Jid,
    id: String,
}

impl JabberResource {
    pub fn new(jid: Jid) -> Self {
        let id = jid.to_string();
        Self { jid, id }
    }

    pub fn jid(&self) -> &Jid {
        &self.jid
    }
}

impl ChatUnit for JabberResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> String {
        match self.jid.resource() {
            Some(resource) => format!("{} ({resource})", self.jid.bare()),
            None => self.id.clone(),
        }
    }
}

/// Active resource per bare contact JID.
#[derive(Debug, Default)]
pub struct JabberSessionRouter {
    active: RwLock<HashMap<Jid, String>>,
}

impl JabberSessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a presence from a full JID. An available resource becomes the
    /// active one; the active resource going away clears the entry.
    pub fn presence_changed(&self, from: &Jid, available: bool) {
        let Some(resource) = from.resource() else {
            return;
        };
        let bare = from.bare();
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if available {
            debug!(contact = %bare, resource, "active resource changed");
            active.insert(bare, resource.to_string());
        } else if active.get(&bare).is_some_and(|r| r == resource) {
            debug!(contact = %bare, resource, "active resource went offline");
            active.remove(&bare);
        }
    }

    pub fn active_resource(&self, contact: &Jid) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&contact.bare())
            .cloned()
    }

    pub fn clear(&self) {
        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SessionRouter for JabberSessionRouter {
    fn unit_for_session(&self, account: &Account, unit: Arc<dyn ChatUnit>) -> Arc<dyn ChatUnit> {
        let Ok(jid) = Jid::parse(unit.id()) else {
            return unit;
        };
        if !jid.is_bare() {
            return unit;
        }
        match self.active_resource(&jid) {
            Some(resource) => {
                debug!(account_id = %account.id(), contact = %jid, %resource, "routing session to resource");
                Arc::new(JabberResource::new(jid.with_resource(resource)))
            },
            None => unit,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::JabberContact,
        parley_accounts::{AccountBuilder, AppContext, Protocol},
    };

    fn routed_account(router: Arc<JabberSessionRouter>) -> (Arc<AppContext>, Arc<Account>) {
        let context = AppContext::in_memory();
        let protocol = Protocol::register(&context, "jabber").unwrap();
        let account = protocol
            .add_account(AccountBuilder::new("alice@example.com").with_session_router(router))
            .unwrap();
        (context, account)
    }

    fn contact(jid: &str) -> Arc<dyn ChatUnit> {
        Arc::new(JabberContact::new(Jid::parse(jid).unwrap()))
    }

    #[test]
    fn bare_contact_routes_to_active_resource() {
        let router = Arc::new(JabberSessionRouter::new());
        let (_context, account) = routed_account(Arc::clone(&router));
        router.presence_changed(&Jid::parse("bob@example.com/phone").unwrap(), true);
        router.presence_changed(&Jid::parse("bob@example.com/laptop").unwrap(), true);

        let routed = account.unit_for_session(contact("bob@example.com"));
        assert_eq!(routed.id(), "bob@example.com/laptop");
        assert_eq!(routed.title(), "bob@example.com (laptop)");
    }

    #[test]
    fn no_active_resource_keeps_unit() {
        let router = Arc::new(JabberSessionRouter::new());
        let (_context, account) = routed_account(router);
        let unit = contact("bob@example.com");
        assert!(Arc::ptr_eq(&account.unit_for_session(Arc::clone(&unit)), &unit));
    }

    #[test]
    fn full_jid_unit_is_not_rerouted() {
        let router = Arc::new(JabberSessionRouter::new());
        let (_context, account) = routed_account(Arc::clone(&router));
        router.presence_changed(&Jid::parse("bob@example.com/laptop").unwrap(), true);

        let unit: Arc<dyn ChatUnit> = Arc::new(JabberResource::new(
            Jid::parse("bob@example.com/phone").unwrap(),
        ));
        assert!(Arc::ptr_eq(&account.unit_for_session(Arc::clone(&unit)), &unit));
    }

    #[test]
    fn only_the_active_resource_going_offline_clears() {
        let router = JabberSessionRouter::new();
        let bob = Jid::parse("bob@example.com").unwrap();
        router.presence_changed(&bob.with_resource("phone"), true);
        router.presence_changed(&bob.with_resource("laptop"), false);
        assert_eq!(router.active_resource(&bob).as_deref(), Some("phone"));

        router.presence_changed(&bob.with_resource("phone"), false);
        assert!(router.active_resource(&bob).is_none());
    }

    #[test]
    fn bare_presence_is_ignored() {
        let router = JabberSessionRouter::new();
        let bob = Jid::parse("bob@example.com").unwrap();
        router.presence_changed(&bob, true);
        assert!(router.active_resource(&bob).is_none());
    }
}
