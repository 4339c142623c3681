//! Group chat managers and the registry tracking which account owns which.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use parley_metrics::{gauge, group_chat as gc_metrics};

use crate::{
    Account, AccountKey,
    observer::{Observers, SubscriptionId},
};

/// Joins and tracks conferences for one account.
pub trait GroupChatManager: Send + Sync {
    /// Account the manager was created for; `None` once that account is gone.
    fn account(&self) -> Option<Arc<Account>>;

    /// Rooms currently joined through this manager.
    fn rooms(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Receives registry changes.
pub trait RegistryObserver: Send + Sync {
    fn on_manager_added(&self, _account: AccountKey, _manager: &Arc<dyn GroupChatManager>) {}

    fn on_manager_removed(&self, _account: AccountKey, _manager: &Arc<dyn GroupChatManager>) {}
}

/// Live group chat managers keyed by owning account, in registration order.
///
/// An account has at most one entry. Registering a second manager for the
/// same account logs a conflict and replaces the stale entry, reporting it
/// to observers as removed.
#[derive(Default)]
pub struct GroupChatManagerRegistry {
    entries: RwLock<Vec<(AccountKey, Arc<dyn GroupChatManager>)>>,
    observers: Observers<dyn RegistryObserver>,
}

impl GroupChatManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, account: AccountKey, manager: Arc<dyn GroupChatManager>) {
        let displaced = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            match entries.iter_mut().find(|(key, _)| *key == account) {
                Some((_, existing)) if Arc::ptr_eq(existing, &manager) => {
                    debug!(%account, "group chat manager already registered");
                    return;
                },
                Some((_, existing)) => {
                    warn!(%account, "account already has a registered group chat manager, replacing it");
                    Some(std::mem::replace(existing, Arc::clone(&manager)))
                },
                None => {
                    entries.push((account, Arc::clone(&manager)));
                    None
                },
            }
        };
        debug!(%account, "group chat manager registered");
        self.record_len();

        if let Some(old) = displaced {
            self.observers
                .notify(|o| o.on_manager_removed(account, &old));
        }
        self.observers
            .notify(|o| o.on_manager_added(account, &manager));
    }

    /// Remove the entry for `account` if it is `manager`. Returns whether an
    /// entry was removed.
    pub fn remove(&self, account: AccountKey, manager: &Arc<dyn GroupChatManager>) -> bool {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            match entries
                .iter()
                .position(|(key, existing)| *key == account && Arc::ptr_eq(existing, manager))
            {
                Some(index) => Some(entries.remove(index)),
                None => None,
            }
        };
        let Some((_, removed)) = removed else {
            debug!(%account, "group chat manager not registered, nothing to remove");
            return false;
        };
        debug!(%account, "group chat manager unregistered");
        self.record_len();
        self.observers
            .notify(|o| o.on_manager_removed(account, &removed));
        true
    }

    pub fn manager_for(&self, account: AccountKey) -> Option<Arc<dyn GroupChatManager>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(key, _)| *key == account)
            .map(|(_, manager)| Arc::clone(manager))
    }

    pub fn contains(&self, account: AccountKey) -> bool {
        self.manager_for(account).is_some()
    }

    /// All registered managers, oldest first.
    pub fn managers(&self) -> Vec<Arc<dyn GroupChatManager>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, manager)| Arc::clone(manager))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn record_len(&self) {
        #[cfg(feature = "metrics")]
        gauge!(gc_metrics::MANAGERS_REGISTERED).set(self.len() as f64);
    }
}
