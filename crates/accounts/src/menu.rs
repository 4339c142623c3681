//! Generic action and capability carrier.
//!
//! Accounts, contacts and conferences each hold a [`MenuController`]. A
//! controller answers capability lookups from its own table and otherwise
//! defers to its owner, so a contact's menu can inherit what its account
//! offers.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::debug;

use crate::{Capability, CapabilityId, Error, Result};

/// A user-visible action offered by a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuAction {
    pub id: String,
    pub text: String,
    /// Higher sorts first.
    pub priority: i32,
}

impl MenuAction {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Default)]
pub struct MenuController {
    actions: RwLock<Vec<MenuAction>>,
    capabilities: RwLock<HashMap<CapabilityId, Capability>>,
    owner: RwLock<Option<Arc<MenuController>>>,
}

impl MenuController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, replacing one with the same id.
    pub fn add_action(&self, action: MenuAction) {
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        actions.retain(|a| a.id != action.id);
        actions.push(action);
    }

    pub fn remove_action(&self, id: &str) -> bool {
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        let before = actions.len();
        actions.retain(|a| a.id != id);
        actions.len() != before
    }

    /// Own actions followed by the owner chain's, highest priority first.
    /// Ties keep that order.
    pub fn actions(&self) -> Vec<MenuAction> {
        let mut all = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(owner) = self.owner() {
            all.extend(owner.actions());
        }
        all.sort_by_key(|a| std::cmp::Reverse(a.priority));
        all
    }

    pub fn register_capability(&self, id: CapabilityId, capability: Capability) {
        debug!(capability = %id, "capability registered on menu controller");
        self.capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, capability);
    }

    pub fn unregister_capability(&self, id: &CapabilityId) -> Option<Capability> {
        self.capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Own capability table first, then the owner chain.
    pub fn lookup(&self, id: &CapabilityId) -> Option<Capability> {
        let local = self
            .capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        match local {
            Some(capability) => Some(capability),
            None => self.owner().and_then(|owner| owner.lookup(id)),
        }
    }

    pub fn owner(&self) -> Option<Arc<MenuController>> {
        self.owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set the controller lookups fall back to. Fails if `self` is already
    /// reachable from `owner`.
    pub fn set_owner(&self, owner: Option<Arc<MenuController>>) -> Result<()> {
        let mut cursor = owner.clone();
        while let Some(node) = cursor {
            if std::ptr::eq(Arc::as_ptr(&node), self) {
                return Err(Error::MenuOwnerCycle);
            }
            cursor = node.owner();
        }
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = owner;
        Ok(())
    }
}
