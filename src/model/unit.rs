//! Unit documents.

use crate::store::{DocKind, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a unit. Units only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Life {
    Alive,
    Dying,
    Dead,
}

impl fmt::Display for Life {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Life::Alive => "alive",
            Life::Dying => "dying",
            Life::Dead => "dead",
        };
        f.pad(s)
    }
}

/// One running instance of an application, e.g. `mysql/0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub life: Life,

    /// Attached storage, in attachment order.
    #[serde(default)]
    pub storage_attachments: Vec<String>,
}

impl Unit {
    /// A new Alive unit with no storage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            life: Life::Alive,
            storage_attachments: Vec::new(),
        }
    }

    pub fn with_storage(mut self, attachment: impl Into<String>) -> Self {
        self.storage_attachments.push(attachment.into());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.life == Life::Alive
    }

    /// The owning application, derived from the name.
    pub fn application(&self) -> &str {
        super::names::application_of(&self.name).unwrap_or_default()
    }
}

impl Document for Unit {
    const KIND: DocKind = DocKind::Unit;

    fn id(&self) -> String {
        self.name.clone()
    }
}
