//! Account parameters as shown in the account settings dialog.

use {
    parley_accounts::{Account, ParameterSchema, Parameters},
    parley_config::ConfigGroup,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::JabberSettings;

/// Config group holding the connection settings.
pub const SETTINGS_GROUP: &str = "general";

/// Parameters whose change only applies on the next login.
const RECONNECT_KEYS: [&str; 4] = ["password", "resource", "server", "port"];

/// [`ParameterSchema`] for Jabber accounts, backed by [`JabberSettings`].
///
/// The password round-trips in plain text through both the parameters and
/// the account's config document.
#[derive(Debug, Default)]
pub struct JabberParameters;

impl JabberParameters {
    fn group(account: &Account) -> ConfigGroup {
        account.config_group(SETTINGS_GROUP)
    }
}

impl ParameterSchema for JabberParameters {
    /// Includes the password in plain text for the settings dialog; callers
    /// must not log the returned map.
    fn read(&self, account: &Account) -> Parameters {
        let settings = JabberSettings::load(&Self::group(account));
        let mut parameters = Parameters::new();
        parameters.insert("jid".into(), json!(account.id()));
        parameters.insert(
            "password".into(),
            json!(settings.password.expose_secret()),
        );
        parameters.insert("resource".into(), json!(settings.resource));
        parameters.insert("priority".into(), json!(settings.priority));
        parameters.insert(
            "server".into(),
            settings.server.map_or(Value::Null, Value::String),
        );
        parameters.insert("port".into(), json!(settings.port));
        parameters.insert("auto_reconnect".into(), json!(settings.auto_reconnect));
        parameters
    }

    /// Only keys whose effective value changes are written to the account
    /// layer, so values inherited from the protocol layer stay inherited.
    fn update(&self, account: &Account, parameters: &Parameters) -> Vec<String> {
        let group = Self::group(account);
        let mut settings = JabberSettings::load(&group);
        let mut changed = Vec::new();

        for (key, value) in parameters {
            match apply(&mut settings, key, value) {
                Ok(true) => changed.push(key.clone()),
                Ok(false) => {},
                Err(Rejected::Unknown) => {
                    debug!(account_id = %account.id(), %key, "ignoring unknown parameter");
                },
                Err(Rejected::Mistyped) => {
                    warn!(account_id = %account.id(), %key, %value, "ignoring parameter with wrong type");
                },
            }
        }
        if changed.is_empty() {
            return Vec::new();
        }

        if let Err(e) = persist(&settings, &group, &changed) {
            warn!(account_id = %account.id(), error = %e, "failed to persist jabber settings");
        }
        changed.retain(|key| RECONNECT_KEYS.contains(&key.as_str()));
        changed
    }
}

fn persist(settings: &JabberSettings, group: &ConfigGroup, keys: &[String]) -> crate::Result<()> {
    for key in keys {
        match key.as_str() {
            "password" => group.set_value(key, settings.password.expose_secret())?,
            "resource" => group.set_value(key, &settings.resource)?,
            "priority" => group.set_value(key, settings.priority)?,
            "port" => group.set_value(key, settings.port)?,
            "auto_reconnect" => group.set_value(key, settings.auto_reconnect)?,
            "server" => {
                group.remove(key);
                match &settings.server {
                    Some(server) => group.set_value(key, server)?,
                    // A fallback layer still names a server; mask it.
                    None if JabberSettings::load(group).server.is_some() => {
                        group.set_value(key, Value::Null)?;
                    },
                    None => {},
                }
            },
            _ => {},
        }
    }
    group.sync()?;
    Ok(())
}

enum Rejected {
    Unknown,
    Mistyped,
}

/// Apply one parameter; `Ok(true)` when the stored value changed.
fn apply(settings: &mut JabberSettings, key: &str, value: &Value) -> Result<bool, Rejected> {
    fn replace<T: PartialEq>(slot: &mut T, new: T) -> bool {
        if *slot == new {
            return false;
        }
        *slot = new;
        true
    }

    match key {
        "password" => {
            let new = value.as_str().ok_or(Rejected::Mistyped)?;
            if settings.password.expose_secret() == new {
                return Ok(false);
            }
            settings.password = Secret::new(new.to_string());
            Ok(true)
        },
        "resource" => {
            let new = value
                .as_str()
                .filter(|s| !s.is_empty())
                .ok_or(Rejected::Mistyped)?;
            Ok(replace(&mut settings.resource, new.to_string()))
        },
        "priority" => {
            let new = value
                .as_i64()
                .and_then(|p| i32::try_from(p).ok())
                .ok_or(Rejected::Mistyped)?;
            Ok(replace(&mut settings.priority, new))
        },
        "server" => {
            let new = match value {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(s.clone()),
                _ => return Err(Rejected::Mistyped),
            };
            Ok(replace(&mut settings.server, new))
        },
        "port" => {
            let new = value
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p != 0)
                .ok_or(Rejected::Mistyped)?;
            Ok(replace(&mut settings.port, new))
        },
        "auto_reconnect" => {
            let new = value.as_bool().ok_or(Rejected::Mistyped)?;
            Ok(replace(&mut settings.auto_reconnect, new))
        },
        _ => Err(Rejected::Unknown),
    }
}
