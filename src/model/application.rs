//! Application documents and their baseline configuration.

use super::config_value::{ConfigValue, OptionType};
use crate::store::{DocKind, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named workload type with a baseline configuration.
///
/// `options` is the declared configuration schema. An application that
/// declares no options accepts any key with any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,

    #[serde(default)]
    pub config: BTreeMap<String, ConfigValue>,

    #[serde(default)]
    pub options: BTreeMap<String, OptionType>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    /// Declare an option (builder style).
    pub fn with_option(mut self, key: impl Into<String>, ty: OptionType) -> Self {
        self.options.insert(key.into(), ty);
        self
    }

    /// Check one setting against the declared options.
    ///
    /// Returns a human-readable reason on failure, suitable for
    /// `InvalidArgument` or `CommitFailed`.
    pub fn check_setting(&self, key: &str, value: &ConfigValue) -> Result<(), String> {
        if self.options.is_empty() {
            return Ok(());
        }

        match self.options.get(key) {
            None => Err(format!("unknown option {:?}", key)),
            Some(ty) if !value.conforms_to(*ty) => Err(format!(
                "option {:?} expects {}, got {} ({})",
                key,
                ty,
                value.type_name(),
                value
            )),
            Some(_) => Ok(()),
        }
    }

    /// Merge a delta into the baseline configuration.
    ///
    /// Every entry is checked before anything is applied, so a failed merge
    /// leaves `config` untouched.
    pub fn merge_config(&mut self, delta: &BTreeMap<String, ConfigValue>) -> Result<(), String> {
        for (key, value) in delta {
            self.check_setting(key, value)?;
        }

        for (key, value) in delta {
            self.config.insert(key.clone(), value.clone());
        }

        Ok(())
    }
}

impl Document for Application {
    const KIND: DocKind = DocKind::Application;

    fn id(&self) -> String {
        self.name.clone()
    }
}
