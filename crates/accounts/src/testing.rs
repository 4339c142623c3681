//! Test doubles shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex, Weak};

use crate::{
    Account, AccountKey, AccountObserver, AppContext, ChatUnit, ContactsFactory, GroupChatManager,
    NotificationRequest, NotificationSink, ParameterSchema, Parameters, RegistryObserver, Status,
};

/// Context with in-memory config and a recording notification sink.
pub(crate) fn memory_context() -> (Arc<AppContext>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let context = AppContext::builder()
        .notification_sink(Arc::clone(&sink) as Arc<dyn NotificationSink>)
        .build();
    (context, sink)
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, request: NotificationRequest) {
        self.sent.lock().unwrap().push(request);
    }
}

#[derive(Default)]
pub(crate) struct EventLog {
    statuses: Mutex<Vec<(Status, Status)>>,
    managers: Mutex<Vec<bool>>,
}

impl EventLog {
    pub(crate) fn status_changes(&self) -> Vec<(Status, Status)> {
        self.statuses.lock().unwrap().clone()
    }

    /// One entry per manager change: `true` for attach, `false` for detach.
    pub(crate) fn manager_changes(&self) -> Vec<bool> {
        self.managers.lock().unwrap().clone()
    }
}

impl AccountObserver for EventLog {
    fn on_status_changed(&self, _account: &Account, current: &Status, previous: &Status) {
        self.statuses
            .lock()
            .unwrap()
            .push((current.clone(), previous.clone()));
    }

    fn on_group_chat_manager_changed(
        &self,
        _account: &Account,
        manager: Option<&Arc<dyn GroupChatManager>>,
    ) {
        self.managers.lock().unwrap().push(manager.is_some());
    }
}

#[derive(Default)]
pub(crate) struct RegistryLog {
    events: Mutex<Vec<String>>,
}

impl RegistryLog {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RegistryObserver for RegistryLog {
    fn on_manager_added(&self, account: AccountKey, _manager: &Arc<dyn GroupChatManager>) {
        self.events.lock().unwrap().push(format!("added {account}"));
    }

    fn on_manager_removed(&self, account: AccountKey, _manager: &Arc<dyn GroupChatManager>) {
        self.events.lock().unwrap().push(format!("removed {account}"));
    }
}

pub(crate) struct StubManager {
    account: Weak<Account>,
}

impl StubManager {
    pub(crate) fn for_account(account: &Arc<Account>) -> Arc<Self> {
        Arc::new(Self {
            account: Arc::downgrade(account),
        })
    }

    /// A manager whose account never existed.
    pub(crate) fn detached() -> Arc<Self> {
        Arc::new(Self {
            account: Weak::new(),
        })
    }
}

impl GroupChatManager for StubManager {
    fn account(&self) -> Option<Arc<Account>> {
        self.account.upgrade()
    }
}

/// Stores whatever it is given; `server` and `port` need a reconnect.
#[derive(Default)]
pub(crate) struct StubSchema {
    values: Mutex<Parameters>,
}

impl ParameterSchema for StubSchema {
    fn read(&self, _account: &Account) -> Parameters {
        self.values.lock().unwrap().clone()
    }

    fn update(&self, _account: &Account, parameters: &Parameters) -> Vec<String> {
        let mut values = self.values.lock().unwrap();
        let mut reconnect = Vec::new();
        for (name, value) in parameters {
            let changed = values.get(name) != Some(value);
            values.insert(name.clone(), value.clone());
            if changed && matches!(name.as_str(), "server" | "port") {
                reconnect.push(name.clone());
            }
        }
        reconnect
    }
}

pub(crate) struct TestUnit(pub(crate) String);

impl ChatUnit for TestUnit {
    fn id(&self) -> &str {
        &self.0
    }
}

/// Creates a fresh unit for any id when asked to.
pub(crate) struct FixedContacts;

impl ContactsFactory for FixedContacts {
    fn contact(&self, id: &str, create: bool) -> Option<Arc<dyn ChatUnit>> {
        create.then(|| Arc::new(TestUnit(id.to_string())) as Arc<dyn ChatUnit>)
    }
}
