use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::Action;

pub const ASSET_AUX_TYPE: &str = "type";
pub const ASSET_AUX_SUBTYPE: &str = "subtype";
pub const ASSET_EXT_MODEL: &str = "model";
pub const ASSET_EXT_DEVICE_PART: &str = "device.part";
pub const ASSET_EXT_NAME: &str = "name";
pub const ASSET_GROUP_PREFIX: &str = "group.";

pub const METRIC_AUX_PORT: &str = "port";
pub const METRIC_AUX_SENSOR_NAME: &str = "sname";
pub const METRIC_AUX_EXT_PORT: &str = "ext-port";
pub const METRIC_AUX_DESCRIPTION: &str = "description";

/// Envelope carried on the bus, tagged by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "UPPERCASE")]
pub enum BusEvent {
    Asset(AssetEvent),
    Metric(MetricEvent),
    Alert(AlertEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetEvent {
    pub operation: String,
    pub name: String,
    #[serde(default)]
    pub aux: BTreeMap<String, String>,
    #[serde(default)]
    pub ext: BTreeMap<String, String>,
}

impl AssetEvent {
    pub fn new(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_aux(mut self, key: &str, value: &str) -> Self {
        self.aux.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_ext(mut self, key: &str, value: &str) -> Self {
        self.ext.insert(key.to_string(), value.to_string());
        self
    }

    pub fn aux_str(&self, key: &str) -> Option<&str> {
        self.aux.get(key).map(String::as_str)
    }

    pub fn ext_str(&self, key: &str) -> Option<&str> {
        self.ext.get(key).map(String::as_str)
    }

    /// Values of every `group.*` extended attribute.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.ext
            .iter()
            .filter(|(k, _)| k.starts_with(ASSET_GROUP_PREFIX))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub quantity: String,
    pub asset: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub time: i64,
    pub ttl: u32,
    #[serde(default)]
    pub aux: BTreeMap<String, String>,
}

impl MetricEvent {
    pub fn new(quantity: &str, asset: &str, value: &str, ttl: u32) -> Self {
        Self {
            quantity: quantity.to_string(),
            asset: asset.to_string(),
            value: value.to_string(),
            ttl,
            ..Default::default()
        }
    }

    pub fn with_aux(mut self, key: &str, value: &str) -> Self {
        self.aux.insert(key.to_string(), value.to_string());
        self
    }

    pub fn aux_str(&self, key: &str) -> Option<&str> {
        self.aux.get(key).map(String::as_str)
    }

    /// `<quantity>@<asset>`
    pub fn topic(&self) -> String {
        format!("{}@{}", self.quantity, self.asset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 | -1 => Self::Warning,
            2 | -2 => Self::Critical,
            _ => Self::Ok,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertState {
    Active,
    Resolved,
}

impl AlertState {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Resolved
        } else {
            Self::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Resolved => "RESOLVED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub time: i64,
    pub ttl: u32,
    pub rule: String,
    pub asset: String,
    pub state: AlertState,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}
