//! Application context: the owned replacement for process-wide singletons.
//!
//! Hosts build one context at startup and pass it to protocol code; tests
//! build their own.

use std::sync::{Arc, PoisonError, RwLock, atomic::AtomicU64};

use {
    parley_config::{ConfigResolver, ConfigSource, LayeredResolver, MemorySource},
    tracing::info,
};

#[cfg(feature = "metrics")]
use parley_metrics::{gauge, protocols as protocol_metrics};

use crate::{
    Account, Error, GroupChatManagerRegistry, NotificationSink, NullNotificationSink, Protocol,
    Result, account::AccountServices,
};

pub struct AppContext {
    protocols: RwLock<Vec<Arc<Protocol>>>,
    config: Arc<dyn ConfigResolver>,
    notifications: Arc<dyn NotificationSink>,
    group_chat_managers: Arc<GroupChatManagerRegistry>,
    next_account_key: Arc<AtomicU64>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// Context with in-memory configuration and no notification delivery.
    pub fn in_memory() -> Arc<Self> {
        Self::builder().build()
    }

    /// Registered protocols, in registration order.
    pub fn protocols(&self) -> Vec<Arc<Protocol>> {
        self.protocols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn protocol(&self, id: &str) -> Option<Arc<Protocol>> {
        self.protocols
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Drop a protocol from the registry. Its accounts go away with it
    /// unless referenced elsewhere.
    pub fn unregister_protocol(&self, id: &str) -> Option<Arc<Protocol>> {
        let removed = {
            let mut protocols = self.protocols.write().unwrap_or_else(PoisonError::into_inner);
            let index = protocols.iter().position(|p| p.id() == id)?;
            protocols.remove(index)
        };
        info!(protocol = %id, "protocol unregistered");
        self.record_protocols();
        Some(removed)
    }

    /// Accounts of all protocols, flattened: protocols in registration
    /// order, each protocol's accounts in ownership order.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.protocols()
            .iter()
            .flat_map(|protocol| protocol.accounts())
            .collect()
    }

    pub fn group_chat_managers(&self) -> &Arc<GroupChatManagerRegistry> {
        &self.group_chat_managers
    }

    pub fn config_resolver(&self) -> &Arc<dyn ConfigResolver> {
        &self.config
    }

    pub fn notification_sink(&self) -> &Arc<dyn NotificationSink> {
        &self.notifications
    }

    pub(crate) fn insert_protocol(&self, protocol: Arc<Protocol>) -> Result<()> {
        {
            let mut protocols = self.protocols.write().unwrap_or_else(PoisonError::into_inner);
            if protocols.iter().any(|p| p.id() == protocol.id()) {
                return Err(Error::DuplicateProtocol {
                    protocol: protocol.id().to_string(),
                });
            }
            protocols.push(protocol);
        }
        self.record_protocols();
        Ok(())
    }

    pub(crate) fn account_services(&self) -> AccountServices {
        AccountServices {
            config: Arc::clone(&self.config),
            notifications: Arc::clone(&self.notifications),
            group_chat_managers: Arc::clone(&self.group_chat_managers),
        }
    }

    pub(crate) fn key_allocator(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.next_account_key)
    }

    fn record_protocols(&self) {
        #[cfg(feature = "metrics")]
        gauge!(protocol_metrics::REGISTERED).set(self.protocols().len() as f64);
    }
}

#[derive(Default)]
pub struct AppContextBuilder {
    config: Option<Arc<dyn ConfigResolver>>,
    notifications: Option<Arc<dyn NotificationSink>>,
}

impl AppContextBuilder {
    pub fn config_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.config = Some(resolver);
        self
    }

    /// Shorthand for a [`LayeredResolver`] over `source`.
    pub fn config_source(self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_resolver(Arc::new(LayeredResolver::new(source)))
    }

    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    pub fn build(self) -> Arc<AppContext> {
        let config = self.config.unwrap_or_else(|| {
            Arc::new(LayeredResolver::new(Arc::new(MemorySource::new())))
        });
        let notifications = self
            .notifications
            .unwrap_or_else(|| Arc::new(NullNotificationSink));
        Arc::new(AppContext {
            protocols: RwLock::new(Vec::new()),
            config,
            notifications,
            group_chat_managers: Arc::new(GroupChatManagerRegistry::new()),
            next_account_key: Arc::new(AtomicU64::new(1)),
        })
    }
}
