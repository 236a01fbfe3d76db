use std::collections::BTreeMap;

use crate::capability::CapabilityKind;

/// A parameter value of an instrument.
///
/// Serialized untagged, so a JSON object like `{"density": 0.1, "method": "clahe"}`
/// deserializes into [`Parameters`] directly.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Text(String),
}

impl ParamValue {
    /// The value as a float, integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Named parameters of an instrument call.
pub type Parameters = BTreeMap<String, ParamValue>;

/// Immutable record of an active module.
///
/// Created when a module becomes active and dropped with the registry entry on the next scan.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PluginDescriptor {
    /// Module name. Instruments report their own, other kinds use the declaration name.
    pub name: String,
    /// Module version.
    pub version: String,
    /// Host version the module targets, reported by instruments only.
    pub compatible_app_version: Option<String>,
    /// The capability of the module.
    pub kind: CapabilityKind,
    /// Label of the host context menu entry.
    pub context_menu_label: String,
    /// Default parameters, empty for non-instrument kinds.
    pub default_parameters: Parameters,
}
