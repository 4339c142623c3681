use {
    parley_config::ConfigGroup,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::Result;

pub const DEFAULT_RESOURCE: &str = "parley";
pub const DEFAULT_PRIORITY: i32 = 30;
pub const DEFAULT_PORT: u16 = 5222;

/// Connection settings of one Jabber account, stored in the account's
/// `general` config group.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JabberSettings {
    /// Redacted in `Debug` only. [`JabberSettings::store`] and serialization
    /// write it in plain text, so the account's config document holds the
    /// password unencrypted.
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,

    /// Resource bound on login; also the default conference nick.
    pub resource: String,

    /// Presence priority.
    pub priority: i32,

    /// Explicit server host. Resolved from the JID domain when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    pub port: u16,

    pub auto_reconnect: bool,
}

impl std::fmt::Debug for JabberSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JabberSettings")
            .field("password", &"[REDACTED]")
            .field("resource", &self.resource)
            .field("priority", &self.priority)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("auto_reconnect", &self.auto_reconnect)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for JabberSettings {
    fn default() -> Self {
        Self {
            password: Secret::new(String::new()),
            resource: DEFAULT_RESOURCE.into(),
            priority: DEFAULT_PRIORITY,
            server: None,
            port: DEFAULT_PORT,
            auto_reconnect: true,
        }
    }
}

impl JabberSettings {
    /// Read every field from `group`, falling back to defaults for missing
    /// or mistyped keys.
    pub fn load(group: &ConfigGroup) -> Self {
        let defaults = Self::default();
        Self {
            password: Secret::new(group.value("password", String::new())),
            resource: group.value("resource", defaults.resource),
            priority: group.value("priority", defaults.priority),
            server: group
                .value::<Option<String>>("server", None)
                .filter(|s| !s.is_empty()),
            port: group.value("port", defaults.port),
            auto_reconnect: group.value("auto_reconnect", defaults.auto_reconnect),
        }
    }

    /// Write every field into `group`. An unset server removes the key.
    pub fn store(&self, group: &ConfigGroup) -> Result<()> {
        group.set_value("password", self.password.expose_secret())?;
        group.set_value("resource", &self.resource)?;
        group.set_value("priority", self.priority)?;
        match &self.server {
            Some(server) => group.set_value("server", server)?,
            None => {
                group.remove("server");
            },
        }
        group.set_value("port", self.port)?;
        group.set_value("auto_reconnect", self.auto_reconnect)?;
        Ok(())
    }

    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}
