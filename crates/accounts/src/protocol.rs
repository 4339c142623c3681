use std::sync::{
    Arc, PoisonError, RwLock, Weak,
    atomic::{AtomicU64, Ordering},
};

use {parley_config::Config, tracing::info};

#[cfg(feature = "metrics")]
use parley_metrics::{accounts as account_metrics, gauge, labels};

use crate::{
    Account, AccountBuilder, AccountKey, AppContext, Error, Result, account::AccountServices,
};

/// Owner and factory of the accounts of one wire protocol.
pub struct Protocol {
    id: String,
    me: Weak<Protocol>,
    services: AccountServices,
    next_key: Arc<AtomicU64>,
    accounts: RwLock<Vec<Arc<Account>>>,
}

impl Protocol {
    /// Create a protocol and append it to the context's protocol list.
    pub fn register(context: &AppContext, id: impl Into<String>) -> Result<Arc<Protocol>> {
        let id = id.into();
        let protocol = Arc::new_cyclic(|me| Protocol {
            id: id.clone(),
            me: me.clone(),
            services: context.account_services(),
            next_key: context.key_allocator(),
            accounts: RwLock::new(Vec::new()),
        });
        context.insert_protocol(Arc::clone(&protocol))?;
        info!(protocol = %id, "protocol registered");
        Ok(protocol)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol-wide configuration (the fallback layer of every account).
    pub fn config(&self) -> Config {
        self.services.config.resolve(std::slice::from_ref(&self.id))
    }

    /// Owned accounts, in the order they were added.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn account(&self, id: &str) -> Option<Arc<Account>> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|a| a.id() == id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.account(id).is_some()
    }

    /// Create an account owned by this protocol. Ids are unique per protocol.
    pub fn add_account(&self, builder: AccountBuilder) -> Result<Arc<Account>> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if accounts.iter().any(|a| a.id() == builder.id()) {
            return Err(Error::duplicate_account(&self.id, builder.id()));
        }
        let key = AccountKey::from_raw(self.next_key.fetch_add(1, Ordering::Relaxed));
        let account = Arc::new(Account::new(
            key,
            builder,
            &self.id,
            self.me.clone(),
            self.services.clone(),
        ));
        accounts.push(Arc::clone(&account));
        info!(protocol = %self.id, account_id = %account.id(), %key, "account added");
        #[cfg(feature = "metrics")]
        gauge!(account_metrics::REGISTERED, labels::PROTOCOL => self.id.clone()).increment(1.0);
        Ok(account)
    }

    /// Give up ownership of an account. The account is destroyed once the
    /// last outside reference is dropped.
    pub fn remove_account(&self, id: &str) -> Option<Arc<Account>> {
        let removed = {
            let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
            let index = accounts.iter().position(|a| a.id() == id)?;
            accounts.remove(index)
        };
        info!(protocol = %self.id, account_id = %id, "account removed");
        #[cfg(feature = "metrics")]
        gauge!(account_metrics::REGISTERED, labels::PROTOCOL => self.id.clone()).decrement(1.0);
        Some(removed)
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("id", &self.id)
            .field("accounts", &self.accounts.read().map(|a| a.len()).unwrap_or(0))
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::testing::memory_context};

    #[test]
    fn duplicate_account_id_is_rejected() {
        let (context, _) = memory_context();
        let protocol = Protocol::register(&context, "jabber").unwrap();
        protocol.add_account(AccountBuilder::new("alice@example.com")).unwrap();
        let err = protocol
            .add_account(AccountBuilder::new("alice@example.com"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAccount { ref account_id, .. } if account_id == "alice@example.com"));
        assert_eq!(protocol.accounts().len(), 1);
    }

    #[test]
    fn accounts_keep_insertion_order() {
        let (context, _) = memory_context();
        let protocol = Protocol::register(&context, "icq").unwrap();
        for id in ["300", "100", "200"] {
            protocol.add_account(AccountBuilder::new(id)).unwrap();
        }
        let ids: Vec<String> = protocol
            .accounts()
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(ids, vec!["300", "100", "200"]);
    }

    #[test]
    fn remove_account_releases_ownership() {
        let (context, _) = memory_context();
        let protocol = Protocol::register(&context, "jabber").unwrap();
        let account = protocol.add_account(AccountBuilder::new("alice@example.com")).unwrap();
        let removed = protocol.remove_account("alice@example.com").unwrap();
        assert!(Arc::ptr_eq(&account, &removed));
        assert!(!protocol.contains("alice@example.com"));
        assert!(protocol.remove_account("alice@example.com").is_none());
    }

    #[test]
    fn keys_are_unique_across_protocols() {
        let (context, _) = memory_context();
        let jabber = Protocol::register(&context, "jabber").unwrap();
        let icq = Protocol::register(&context, "icq").unwrap();
        let a = jabber.add_account(AccountBuilder::new("same")).unwrap();
        let b = icq.add_account(AccountBuilder::new("same")).unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn protocol_config_is_single_layer() {
        let (context, _) = memory_context();
        let protocol = Protocol::register(&context, "jabber").unwrap();
        assert_eq!(protocol.config().paths(), ["jabber"]);
    }
}
