//! Presence status values.
//!
//! A [`Status`] is a plain value: it is cloned into and out of accounts and
//! never refers back to one.

use std::collections::BTreeMap;

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Property key holding the [`ChangeReason`] of a status transition.
pub const CHANGE_REASON_PROPERTY: &str = "changeReason";

/// Presence level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Online,
    FreeChat,
    Away,
    NotAvailable,
    DoNotDisturb,
    Invisible,
    #[default]
    Offline,
    Connecting,
}

/// Why a status transition happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    #[default]
    ByUser,
    ByIdle,
    ByAuthorizationFailed,
    ByNetworkError,
    ByFatalError,
}

impl ChangeReason {
    pub const ALL: &'static [ChangeReason] = &[
        Self::ByUser,
        Self::ByIdle,
        Self::ByAuthorizationFailed,
        Self::ByNetworkError,
        Self::ByFatalError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByUser => "by_user",
            Self::ByIdle => "by_idle",
            Self::ByAuthorizationFailed => "by_authorization_failed",
            Self::ByNetworkError => "by_network_error",
            Self::ByFatalError => "by_fatal_error",
        }
    }

    /// Legacy integer code, as stored by older configuration and plugins.
    pub fn code(self) -> i64 {
        match self {
            Self::ByUser => 0,
            Self::ByIdle => 1,
            Self::ByAuthorizationFailed => 2,
            Self::ByNetworkError => 3,
            Self::ByFatalError => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Accepts either the string name or the legacy integer code.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Self::ALL.iter().copied().find(|r| r.as_str() == name),
            Value::Number(n) => n.as_i64().and_then(Self::from_code),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence status plus free-form properties and extended info records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    status_type: StatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    properties: Map<String, Value>,
    extended_infos: BTreeMap<String, Map<String, Value>>,
}

impl Status {
    pub fn new(status_type: StatusType) -> Self {
        Self {
            status_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_change_reason(mut self, reason: ChangeReason) -> Self {
        self.set_change_reason(reason);
        self
    }

    pub fn status_type(&self) -> StatusType {
        self.status_type
    }

    pub fn set_status_type(&mut self, status_type: StatusType) {
        self.status_type = status_type;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    /// Anything but offline and connecting.
    pub fn is_online(&self) -> bool {
        !matches!(
            self.status_type,
            StatusType::Offline | StatusType::Connecting
        )
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    /// Reason stored under [`CHANGE_REASON_PROPERTY`], `ByUser` when absent
    /// or unrecognized.
    pub fn change_reason(&self) -> ChangeReason {
        self.property(CHANGE_REASON_PROPERTY)
            .and_then(ChangeReason::from_value)
            .unwrap_or_default()
    }

    pub fn set_change_reason(&mut self, reason: ChangeReason) {
        self.set_property(CHANGE_REASON_PROPERTY, Value::from(reason.as_str()));
    }

    pub fn extended_infos(&self) -> &BTreeMap<String, Map<String, Value>> {
        &self.extended_infos
    }

    pub fn extended_info(&self, id: &str) -> Option<&Map<String, Value>> {
        self.extended_infos.get(id)
    }

    /// Store an extended info record. The record's `"id"` field is set to
    /// `id` so renderers can work from the values alone.
    pub fn set_extended_info(&mut self, id: impl Into<String>, mut record: Map<String, Value>) {
        let id = id.into();
        record.insert("id".into(), Value::from(id.as_str()));
        self.extended_infos.insert(id, record);
    }

    pub fn remove_extended_info(&mut self, id: &str) -> Option<Map<String, Value>> {
        self.extended_infos.remove(id)
    }

    /// Records ordered by descending `"priority"` (missing = 0), then id.
    pub fn extended_infos_by_priority(&self) -> Vec<&Map<String, Value>> {
        let mut records: Vec<(&String, &Map<String, Value>)> = self.extended_infos.iter().collect();
        records.sort_by(|(a_id, a), (b_id, b)| {
            priority(b).cmp(&priority(a)).then_with(|| a_id.cmp(b_id))
        });
        records.into_iter().map(|(_, record)| record).collect()
    }
}

impl From<StatusType> for Status {
    fn from(status_type: StatusType) -> Self {
        Self::new(status_type)
    }
}

fn priority(record: &Map<String, Value>) -> i64 {
    record.get("priority").and_then(Value::as_i64).unwrap_or(0)
}
