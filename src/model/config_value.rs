//! Loosely-typed configuration values.
//!
//! Configuration deltas carry arbitrary-shaped values. They are kept as a
//! closed tagged enum rather than a dynamic value so documents round-trip
//! exactly and option checks are a `match`, not runtime type inspection.

use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One configuration value.
///
/// Serialized untagged, so a document reads as ordinary JSON/YAML.
/// Variant order matters for deserialization: integers are tried before
/// floats, scalars before collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Parse command-line text as a YAML scalar or flow collection.
    ///
    /// `true` is a bool, `3` an int, `[a, b]` a list, `{k: v}` a map, and
    /// anything else a string. Empty text is the empty string.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(ConfigValue::String(text.to_string()));
        }
        serde_yaml::from_str(text)
            .map_err(|e| FleetError::InvalidArgument(format!("config value {:?}: {}", text, e)))
    }

    /// Short name of the value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Map(_) => "map",
        }
    }

    /// Whether the value may be stored under an option of type `ty`.
    /// Integers are accepted where floats are declared.
    pub fn conforms_to(&self, ty: OptionType) -> bool {
        matches!(
            (self, ty),
            (ConfigValue::Bool(_), OptionType::Boolean)
                | (ConfigValue::Int(_), OptionType::Int)
                | (ConfigValue::Int(_), OptionType::Float)
                | (ConfigValue::Float(_), OptionType::Float)
                | (ConfigValue::String(_), OptionType::String)
                | (ConfigValue::List(_), OptionType::List)
                | (ConfigValue::Map(_), OptionType::Map)
        )
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{}", v),
            ConfigValue::Int(v) => write!(f, "{}", v),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::String(v) => f.write_str(v),
            ConfigValue::List(_) | ConfigValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Declared type of an application option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    String,
    Int,
    Float,
    Boolean,
    List,
    Map,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::String => "string",
            OptionType::Int => "int",
            OptionType::Float => "float",
            OptionType::Boolean => "boolean",
            OptionType::List => "list",
            OptionType::Map => "map",
        }
    }
}

impl FromStr for OptionType {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(OptionType::String),
            "int" => Ok(OptionType::Int),
            "float" => Ok(OptionType::Float),
            "boolean" | "bool" => Ok(OptionType::Boolean),
            "list" => Ok(OptionType::List),
            "map" => Ok(OptionType::Map),
            other => Err(FleetError::InvalidArgument(format!(
                "option type {:?} (expected string, int, float, boolean, list, or map)",
                other
            ))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
