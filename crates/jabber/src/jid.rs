//! Jabber identifiers: `[node@]domain[/resource]`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A parsed JID. Node and domain are compared case-insensitively and stored
/// lowercased; the resource is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    node: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    /// The JID without its resource.
    #[must_use]
    pub fn bare(&self) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    /// The bare JID with `resource` attached.
    #[must_use]
    pub fn with_resource(&self, resource: impl Into<String>) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: Some(resource.into()),
        }
    }

    /// Node if present, otherwise the domain. Used as a default display name.
    pub fn local_name(&self) -> &str {
        self.node.as_deref().unwrap_or(&self.domain)
    }
}

impl FromStr for Jid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (bare, resource) = match s.split_once('/') {
            Some((bare, resource)) => (bare, Some(resource)),
            None => (s, None),
        };
        let (node, domain) = match bare.split_once('@') {
            Some((node, domain)) => (Some(node), domain),
            None => (None, bare),
        };

        if domain.is_empty() {
            return Err(Error::invalid_jid(s, "empty domain"));
        }
        if domain.contains('@') {
            return Err(Error::invalid_jid(s, "more than one '@'"));
        }
        if node.is_some_and(str::is_empty) {
            return Err(Error::invalid_jid(s, "empty node"));
        }
        if resource.is_some_and(str::is_empty) {
            return Err(Error::invalid_jid(s, "empty resource"));
        }
        if bare.chars().any(char::is_whitespace) {
            return Err(Error::invalid_jid(s, "whitespace in bare JID"));
        }

        Ok(Jid {
            node: node.map(str::to_lowercase),
            domain: domain.to_lowercase(),
            resource: resource.map(str::to_string),
        })
    }
}

impl TryFrom<String> for Jid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "{node}@")?;
        }
        f.write_str(&self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}
