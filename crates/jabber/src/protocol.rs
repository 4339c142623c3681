//! The `jabber` protocol and its account wiring.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use {
    parley_accounts::{
        Account, AccountBuilder, AppContext, Capability, CapabilityId, Protocol, Status,
    },
    parley_config::ConfigGroup,
    tracing::info,
};

use crate::{
    Error, JabberGroupChatManager, JabberParameters, JabberRoster, JabberSessionRouter,
    JabberSettings, Jid, Result, parameters::SETTINGS_GROUP,
};

pub const PROTOCOL_ID: &str = "jabber";

/// Capability id under which each account's roster is also exposed on its
/// menu controller.
pub const ROSTER_CAPABILITY: &str = "org.parley.jabber.Roster";

/// A Jabber account together with its protocol-side services.
#[derive(Clone)]
pub struct JabberAccount {
    pub account: Arc<Account>,
    pub jid: Jid,
    pub roster: Arc<JabberRoster>,
    pub router: Arc<JabberSessionRouter>,
    pub group_chat: Arc<JabberGroupChatManager>,
}

impl JabberAccount {
    pub fn settings(&self) -> JabberSettings {
        JabberSettings::load(&self.account.config_group(SETTINGS_GROUP))
    }

    pub fn set_status(&self, status: Status) {
        self.account.set_status(status);
    }
}

impl std::fmt::Debug for JabberAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JabberAccount")
            .field("jid", &self.jid)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Protocol-side services of one account. The account itself is owned only
/// by the core [`Protocol`].
#[derive(Clone)]
struct AccountServices {
    jid: Jid,
    roster: Arc<JabberRoster>,
    router: Arc<JabberSessionRouter>,
    group_chat: Arc<JabberGroupChatManager>,
}

impl AccountServices {
    fn handle(self, account: Arc<Account>) -> JabberAccount {
        JabberAccount {
            account,
            jid: self.jid,
            roster: self.roster,
            router: self.router,
            group_chat: self.group_chat,
        }
    }
}

pub struct JabberProtocol {
    protocol: Arc<Protocol>,
    services: RwLock<HashMap<String, AccountServices>>,
}

impl JabberProtocol {
    /// Register the `jabber` protocol with `context`.
    pub fn register(context: &AppContext) -> Result<Arc<Self>> {
        let protocol = Protocol::register(context, PROTOCOL_ID)?;
        Ok(Arc::new(Self {
            protocol,
            services: RwLock::new(HashMap::new()),
        }))
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    /// Create an account for `jid`. The account id is the bare JID; a
    /// resource in `jid` becomes the configured resource.
    pub fn add_account(&self, jid: &str) -> Result<JabberAccount> {
        let full = Jid::parse(jid)?;
        let bare = full.bare();
        if bare.node().is_none() {
            return Err(Error::invalid_jid(jid, "account JID needs a node"));
        }

        let roster = Arc::new(JabberRoster::new());
        let router = Arc::new(JabberSessionRouter::new());
        let account = self.protocol.add_account(
            AccountBuilder::new(bare.to_string())
                .with_name(bare.local_name())
                .with_parameter_schema(Arc::new(JabberParameters))
                .with_session_router(Arc::clone(&router) as _)
                .with_contacts_factory(Arc::clone(&roster) as _),
        )?;
        account.menu().register_capability(
            CapabilityId::new(ROSTER_CAPABILITY),
            Capability::Custom(Arc::clone(&roster) as _),
        );

        let general = account.config_group(SETTINGS_GROUP);
        if let Some(resource) = full.resource()
            && let Err(e) = store_resource(&general, resource)
        {
            self.protocol.remove_account(account.id());
            return Err(e);
        }
        let settings = JabberSettings::load(&general);

        let group_chat = JabberGroupChatManager::new(&account, settings.resource);
        account.reset_group_chat_manager(Some(Arc::clone(&group_chat) as _));

        let services = AccountServices {
            jid: bare.clone(),
            roster,
            router,
            group_chat,
        };
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bare.to_string(), services.clone());
        info!(jid = %bare, "jabber account created");
        Ok(services.handle(account))
    }

    /// Handle for `jid`, as long as the core protocol still owns the account.
    pub fn account(&self, jid: &str) -> Option<JabberAccount> {
        let bare = Jid::parse(jid).ok()?.bare().to_string();
        let Some(account) = self.protocol.account(&bare) else {
            self.forget(&bare);
            return None;
        };
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&bare)
            .cloned()
            .map(|services| services.handle(account))
    }

    /// Accounts in creation order.
    pub fn accounts(&self) -> Vec<JabberAccount> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        self.protocol
            .accounts()
            .into_iter()
            .filter_map(|account| {
                let entry = services.get(account.id()).cloned()?;
                Some(entry.handle(account))
            })
            .collect()
    }

    pub fn remove_account(&self, jid: &str) -> Option<JabberAccount> {
        let bare = Jid::parse(jid).ok()?.bare().to_string();
        let services = self.forget(&bare);
        let account = self.protocol.remove_account(&bare)?;
        info!(jid = %bare, "jabber account removed");
        services.map(|services| services.handle(account))
    }

    /// Drop services left behind by an account removed from the core
    /// protocol directly.
    fn forget(&self, bare: &str) -> Option<AccountServices> {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(bare)
    }
}

fn store_resource(general: &ConfigGroup, resource: &str) -> Result<()> {
    general.set_value("resource", resource)?;
    general.sync()?;
    Ok(())
}

impl std::fmt::Debug for JabberProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JabberProtocol")
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        parley_accounts::{ChangeReason, ChatUnit, GroupChatManager, StatusType},
    };

    #[test]
    fn account_is_fully_wired() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        let handle = jabber.add_account("Alice@Example.com/desk").unwrap();
        let account = &handle.account;

        assert_eq!(account.id(), "alice@example.com");
        assert_eq!(account.name(), "alice");
        assert_eq!(account.protocol_id(), PROTOCOL_ID);
        assert_eq!(handle.settings().resource, "desk");
        assert_eq!(account.parameters()["resource"], "desk");

        let manager = account.group_chat_manager().unwrap();
        assert!(Arc::ptr_eq(&manager.account().unwrap(), account));
        assert!(context.group_chat_managers().contains(account.key()));

        let factory = account
            .lookup(&CapabilityId::CONTACTS_FACTORY)
            .unwrap()
            .as_contacts_factory()
            .cloned()
            .unwrap();
        assert_eq!(factory.contact("bob@example.com", true).unwrap().id(), "bob@example.com");
        assert_eq!(handle.roster.len(), 1);

        let roster = account
            .lookup(&CapabilityId::new(ROSTER_CAPABILITY))
            .unwrap()
            .downcast::<JabberRoster>()
            .unwrap();
        assert!(Arc::ptr_eq(&roster, &handle.roster));
    }

    #[test]
    fn conference_nick_defaults_to_resource() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        let handle = jabber.add_account("alice@example.com").unwrap();
        let room = Jid::parse("rust@conference.example.com").unwrap();
        handle.group_chat.join(&room, None).unwrap();
        assert_eq!(handle.group_chat.nick_in(&room).as_deref(), Some("parley"));
    }

    #[test]
    fn sessions_route_through_roster_contacts() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        let handle = jabber.add_account("alice@example.com").unwrap();
        handle
            .router
            .presence_changed(&Jid::parse("bob@example.com/phone").unwrap(), true);

        let bob = handle.roster.get_or_insert(&Jid::parse("bob@example.com").unwrap());
        let routed = handle.account.unit_for_session(bob);
        assert_eq!(routed.id(), "bob@example.com/phone");
    }

    #[test]
    fn duplicate_and_invalid_accounts() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        jabber.add_account("alice@example.com").unwrap();
        assert!(matches!(
            jabber.add_account("alice@example.com/other"),
            Err(Error::Accounts(parley_accounts::Error::DuplicateAccount { .. }))
        ));
        assert!(matches!(
            jabber.add_account("example.com"),
            Err(Error::InvalidJid { .. })
        ));
        assert!(matches!(
            JabberProtocol::register(&context),
            Err(Error::Accounts(parley_accounts::Error::DuplicateProtocol { .. }))
        ));
    }

    #[test]
    fn remove_account_releases_manager() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        jabber.add_account("alice@example.com").unwrap();
        jabber.add_account("carol@example.com").unwrap();
        let ids: Vec<String> = jabber.accounts().iter().map(|a| a.jid.to_string()).collect();
        assert_eq!(ids, vec!["alice@example.com", "carol@example.com"]);

        let removed = jabber.remove_account("alice@example.com").unwrap();
        assert!(jabber.account("alice@example.com").is_none());
        assert!(!jabber.protocol().contains("alice@example.com"));
        let key = removed.account.key();
        drop(removed);
        assert!(!context.group_chat_managers().contains(key));
        assert_eq!(context.group_chat_managers().len(), 1);
    }

    #[test]
    fn authorization_failure_goes_through_core() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        let handle = jabber.add_account("alice@example.com").unwrap();
        handle.set_status(
            Status::new(StatusType::Offline).with_change_reason(ChangeReason::ByAuthorizationFailed),
        );
        assert_eq!(
            handle.account.status().change_reason(),
            ChangeReason::ByAuthorizationFailed
        );
    }

    #[test]
    fn core_removal_is_not_masked_by_jabber_handles() {
        let context = AppContext::in_memory();
        let jabber = JabberProtocol::register(&context).unwrap();
        let key = jabber.add_account("alice@example.com").unwrap().account.key();
        assert!(context.group_chat_managers().contains(key));

        assert!(jabber.protocol().remove_account("alice@example.com").is_some());
        assert!(!context.group_chat_managers().contains(key));
        assert!(jabber.account("alice@example.com").is_none());
        assert!(jabber.accounts().is_empty());
        assert!(jabber.remove_account("alice@example.com").is_none());
    }
}
