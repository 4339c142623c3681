use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use crate::{Account, GroupChatManager, Status};

/// Receives account change events.
///
/// Callbacks run synchronously on the mutating thread, after the state
/// change, in subscription order. Re-entering `set_status` or
/// `reset_group_chat_manager` on the same account from a callback is not
/// supported.
pub trait AccountObserver: Send + Sync {
    fn on_status_changed(&self, _account: &Account, _current: &Status, _previous: &Status) {}

    fn on_group_chat_manager_changed(
        &self,
        _account: &Account,
        _manager: Option<&Arc<dyn GroupChatManager>>,
    ) {
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered subscriber list.
///
/// `notify` snapshots the list and releases the lock before calling out, so
/// subscribers may (un)subscribe from inside a callback.
pub(crate) struct Observers<T: ?Sized> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(SubscriptionId, Arc<T>)>>,
}

impl<T: ?Sized> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> Observers<T> {
    pub(crate) fn subscribe(&self, observer: Arc<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn notify(&self, mut f: impl FnMut(&T)) {
        let snapshot: Vec<Arc<T>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in &snapshot {
            f(observer);
        }
    }
}
