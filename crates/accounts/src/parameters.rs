//! Protocol-specific account parameters.

use serde_json::{Map, Value};

use crate::Account;

/// Named parameter values, as shown in account settings.
pub type Parameters = Map<String, Value>;

/// Read/update contract for an account's configurable fields.
///
/// Implemented once per protocol account type; the account core only calls
/// through it and never interprets the parameters itself.
pub trait ParameterSchema: Send + Sync {
    /// Current parameter values.
    fn read(&self, account: &Account) -> Parameters;

    /// Apply `parameters` and return the names of those whose change only
    /// takes effect after reconnecting.
    fn update(&self, account: &Account, parameters: &Parameters) -> Vec<String>;
}
