//! The account entity: identity, status, capabilities, configuration.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, Weak},
};

use {
    parley_config::{Config, ConfigGroup, ConfigResolver},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use parley_metrics::{
    accounts as account_metrics, counter, group_chat as gc_metrics, labels, notifications,
};

use crate::{
    Capability, CapabilityId, ChangeReason, ChatUnit, ContactsFactory, GroupChatManager,
    GroupChatManagerRegistry, InfoRequestFactory, MenuController, NotificationKind,
    NotificationRequest, NotificationSink, ParameterSchema, Parameters, Protocol, SessionRouter,
    Status,
    observer::{AccountObserver, Observers, SubscriptionId},
};

/// Text of the notification sent when a status change reports failed
/// authorization.
pub const AUTHORIZATION_FAILED_TEXT: &str = "Authorization failed";

/// Process-unique account identity, independent of protocol and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey(u64);

impl AccountKey {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a protocol supplies when creating an account.
pub struct AccountBuilder {
    id: String,
    name: Option<String>,
    parameter_schema: Option<Arc<dyn ParameterSchema>>,
    session_router: Option<Arc<dyn SessionRouter>>,
    contacts_factory: Option<Arc<dyn ContactsFactory>>,
    info_request_factory: Option<Arc<dyn InfoRequestFactory>>,
    menu: Option<Arc<MenuController>>,
}

impl AccountBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            parameter_schema: None,
            session_router: None,
            contacts_factory: None,
            info_request_factory: None,
            menu: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name; defaults to the id.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_parameter_schema(mut self, schema: Arc<dyn ParameterSchema>) -> Self {
        self.parameter_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_session_router(mut self, router: Arc<dyn SessionRouter>) -> Self {
        self.session_router = Some(router);
        self
    }

    #[must_use]
    pub fn with_contacts_factory(mut self, factory: Arc<dyn ContactsFactory>) -> Self {
        self.contacts_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn with_info_request_factory(mut self, factory: Arc<dyn InfoRequestFactory>) -> Self {
        self.info_request_factory = Some(factory);
        self
    }

    /// Use an existing controller as the capability fallback.
    #[must_use]
    pub fn with_menu(mut self, menu: Arc<MenuController>) -> Self {
        self.menu = Some(menu);
        self
    }
}

/// Shared services an account needs, handed down from the context.
#[derive(Clone)]
pub(crate) struct AccountServices {
    pub(crate) config: Arc<dyn ConfigResolver>,
    pub(crate) notifications: Arc<dyn NotificationSink>,
    pub(crate) group_chat_managers: Arc<GroupChatManagerRegistry>,
}

/// A single identity under a protocol.
///
/// Accounts are created by [`Protocol::add_account`] and live as long as
/// the protocol keeps them (or longer, if a caller holds on to the `Arc`).
pub struct Account {
    key: AccountKey,
    id: String,
    name: Option<String>,
    protocol_id: String,
    protocol: Weak<Protocol>,
    status: RwLock<Status>,
    group_chat_manager: RwLock<Option<Arc<dyn GroupChatManager>>>,
    contacts_factory: RwLock<Option<Arc<dyn ContactsFactory>>>,
    info_request_factory: RwLock<Option<Arc<dyn InfoRequestFactory>>>,
    parameter_schema: Option<Arc<dyn ParameterSchema>>,
    session_router: Option<Arc<dyn SessionRouter>>,
    menu: Arc<MenuController>,
    observers: Observers<dyn AccountObserver>,
    services: AccountServices,
}

impl Account {
    pub(crate) fn new(
        key: AccountKey,
        builder: AccountBuilder,
        protocol_id: &str,
        protocol: Weak<Protocol>,
        services: AccountServices,
    ) -> Self {
        Self {
            key,
            id: builder.id,
            name: builder.name,
            protocol_id: protocol_id.to_string(),
            protocol,
            status: RwLock::new(Status::default()),
            group_chat_manager: RwLock::new(None),
            contacts_factory: RwLock::new(builder.contacts_factory),
            info_request_factory: RwLock::new(builder.info_request_factory),
            parameter_schema: builder.parameter_schema,
            session_router: builder.session_router,
            menu: builder.menu.unwrap_or_default(),
            observers: Observers::default(),
            services,
        }
    }

    /// Every account of every registered protocol, protocols in registration
    /// order, accounts in ownership order.
    pub fn all(context: &crate::AppContext) -> Vec<Arc<Account>> {
        context.accounts()
    }

    pub fn key(&self) -> AccountKey {
        self.key
    }

    /// Stable identity within the protocol (e.g. a JID).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Owning protocol, `None` only once the protocol itself is gone.
    pub fn protocol(&self) -> Option<Arc<Protocol>> {
        self.protocol.upgrade()
    }

    // ── Status ──────────────────────────────────────────────────────────────

    pub fn status(&self) -> Status {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the status and tell observers `(new, old)`.
    ///
    /// A status carrying `ByAuthorizationFailed` first raises a system
    /// notification. Every status value is accepted.
    pub fn set_status(&self, status: Status) {
        let reason = status.change_reason();
        match reason {
            ChangeReason::ByUser
            | ChangeReason::ByIdle
            | ChangeReason::ByNetworkError
            | ChangeReason::ByFatalError => {},
            ChangeReason::ByAuthorizationFailed => {
                warn!(account_id = %self.id, protocol = %self.protocol_id, "authorization failed");
                self.services.notifications.send(
                    NotificationRequest::new(NotificationKind::System)
                        .with_text(AUTHORIZATION_FAILED_TEXT),
                );
                #[cfg(feature = "metrics")]
                counter!(notifications::SENT_TOTAL, labels::KIND => "system").increment(1);
            },
        }

        let previous = {
            let mut current = self.status.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, status.clone())
        };
        debug!(
            account_id = %self.id,
            protocol = %self.protocol_id,
            from = ?previous.status_type(),
            to = ?status.status_type(),
            %reason,
            "account status changed"
        );
        #[cfg(feature = "metrics")]
        counter!(
            account_metrics::STATUS_CHANGES_TOTAL,
            labels::PROTOCOL => self.protocol_id.clone(),
            labels::REASON => reason.as_str()
        )
        .increment(1);

        self.observers
            .notify(|o| o.on_status_changed(self, &status, &previous));
    }

    // ── Configuration ───────────────────────────────────────────────────────

    /// Layered config paths: the account's own document, then the
    /// protocol-wide one.
    pub fn config_paths(&self) -> Vec<String> {
        vec![
            format!("{}.{}/account", self.protocol_id, self.id),
            self.protocol_id.clone(),
        ]
    }

    pub fn config(&self) -> Config {
        self.services.config.resolve(&self.config_paths())
    }

    pub fn config_group(&self, name: &str) -> ConfigGroup {
        self.config().group(name)
    }

    // ── Parameters ──────────────────────────────────────────────────────────

    /// Current protocol parameters; empty when the protocol defines none.
    pub fn parameters(&self) -> Parameters {
        match &self.parameter_schema {
            Some(schema) => schema.read(self),
            None => Parameters::new(),
        }
    }

    /// Apply parameters, returning the names that need a reconnect.
    pub fn update_parameters(&self, parameters: &Parameters) -> Vec<String> {
        let Some(schema) = &self.parameter_schema else {
            debug!(account_id = %self.id, "no parameter schema, update ignored");
            return Vec::new();
        };
        let reconnect = schema.update(self, parameters);
        if !reconnect.is_empty() {
            info!(account_id = %self.id, ?reconnect, "parameters changed, reconnection required");
        }
        reconnect
    }

    /// The unit a chat session with `unit` should actually use.
    pub fn unit_for_session(&self, unit: Arc<dyn ChatUnit>) -> Arc<dyn ChatUnit> {
        match &self.session_router {
            Some(router) => router.unit_for_session(self, unit),
            None => unit,
        }
    }

    // ── Capabilities ────────────────────────────────────────────────────────

    pub fn group_chat_manager(&self) -> Option<Arc<dyn GroupChatManager>> {
        self.group_chat_manager
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contacts_factory(&self) -> Option<Arc<dyn ContactsFactory>> {
        self.contacts_factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_contacts_factory(&self, factory: Option<Arc<dyn ContactsFactory>>) {
        *self
            .contacts_factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = factory;
    }

    pub fn info_request_factory(&self) -> Option<Arc<dyn InfoRequestFactory>> {
        self.info_request_factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_info_request_factory(&self, factory: Option<Arc<dyn InfoRequestFactory>>) {
        *self
            .info_request_factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = factory;
    }

    /// Generic capability base; unknown capability ids resolve here.
    pub fn menu(&self) -> &Arc<MenuController> {
        &self.menu
    }

    /// Resolve a capability by id.
    ///
    /// The well-known ids answer from the account's own slots, even when the
    /// slot is empty. Any other id is delegated to the menu controller.
    pub fn lookup(&self, id: &CapabilityId) -> Option<Capability> {
        if *id == CapabilityId::GROUP_CHAT_MANAGER {
            return self.group_chat_manager().map(Capability::GroupChatManager);
        }
        if *id == CapabilityId::CONTACTS_FACTORY {
            return self.contacts_factory().map(Capability::ContactsFactory);
        }
        if *id == CapabilityId::INFO_REQUEST_FACTORY {
            return self.info_request_factory().map(Capability::InfoRequestFactory);
        }
        #[cfg(feature = "metrics")]
        counter!(account_metrics::CAPABILITY_FALLBACKS_TOTAL).increment(1);
        self.menu.lookup(id)
    }

    /// Attach, replace or detach the group chat manager.
    ///
    /// # Panics
    ///
    /// If `manager` was created for a different account.
    pub fn reset_group_chat_manager(&self, manager: Option<Arc<dyn GroupChatManager>>) {
        if let Some(candidate) = &manager {
            let owner = candidate.account();
            assert!(
                owner.is_some_and(|owner| std::ptr::eq(Arc::as_ptr(&owner), self)),
                "group chat manager was created for another account"
            );
        }

        let previous = {
            let mut slot = self
                .group_chat_manager
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let unchanged = match (slot.as_ref(), manager.as_ref()) {
                (None, None) => true,
                (Some(current), Some(candidate)) => Arc::ptr_eq(current, candidate),
                _ => false,
            };
            if unchanged {
                return;
            }
            if manager.is_some() && slot.is_some() {
                warn!(
                    account_id = %self.id,
                    protocol = %self.protocol_id,
                    "group chat manager is already set, overwriting"
                );
                #[cfg(feature = "metrics")]
                counter!(gc_metrics::ATTACH_CONFLICTS_TOTAL).increment(1);
            }
            std::mem::replace(&mut *slot, manager.clone())
        };

        match (&manager, &previous) {
            // A direct manager-to-manager swap is not deregistered here; the
            // registry itself drops the stale entry for this account.
            (Some(candidate), _) => self
                .services
                .group_chat_managers
                .add(self.key, Arc::clone(candidate)),
            (None, Some(previous)) => {
                self.services
                    .group_chat_managers
                    .remove(self.key, previous);
            },
            (None, None) => {},
        }

        self.observers
            .notify(|o| o.on_group_chat_manager_changed(self, manager.as_ref()));
    }

    // ── Observers ───────────────────────────────────────────────────────────

    pub fn subscribe(&self, observer: Arc<dyn AccountObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl Drop for Account {
    fn drop(&mut self) {
        let attached = self
            .group_chat_manager
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(manager) = attached {
            debug!(account_id = %self.id, "detaching group chat manager of dropped account");
            self.services.group_chat_managers.remove(self.key, &manager);
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("protocol", &self.protocol_id)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
