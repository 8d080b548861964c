//! Branch documents: staged configuration overlays.

use super::config_value::ConfigValue;
use crate::store::{DocKind, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-application state within a branch.
///
/// Every known unit is in exactly one of `tracking` or `pending`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppBranchState {
    #[serde(default)]
    pub config_delta: BTreeMap<String, ConfigValue>,

    /// Units running the branch's delta.
    #[serde(default)]
    pub tracking: BTreeSet<String>,

    /// Known units still running the baseline.
    #[serde(default)]
    pub pending: BTreeSet<String>,
}

impl AppBranchState {
    /// Record a unit as known. Units already tracking stay tracking.
    pub fn observe(&mut self, unit: &str) {
        if !self.tracking.contains(unit) {
            self.pending.insert(unit.to_string());
        }
    }

    /// Move a unit to tracking. Returns false if it already was.
    pub fn track(&mut self, unit: &str) -> bool {
        self.pending.remove(unit);
        self.tracking.insert(unit.to_string())
    }

    /// Drop a unit from both sets. Returns true if it was known.
    pub fn forget(&mut self, unit: &str) -> bool {
        let was_pending = self.pending.remove(unit);
        let was_tracking = self.tracking.remove(unit);
        was_pending || was_tracking
    }

    pub fn knows(&self, unit: &str) -> bool {
        self.tracking.contains(unit) || self.pending.contains(unit)
    }

    /// All units known to the branch for this application.
    pub fn known_units(&self) -> BTreeSet<String> {
        self.tracking.union(&self.pending).cloned().collect()
    }
}

/// A named branch. Its name is its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,

    #[serde(default)]
    pub applications: BTreeMap<String, AppBranchState>,
}

impl Branch {
    /// A fresh branch with no applications.
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            created_by: created_by.into(),
            applications: BTreeMap::new(),
        }
    }

    /// The state for `app`, created empty on first use.
    pub fn app_mut(&mut self, app: &str) -> &mut AppBranchState {
        self.applications.entry(app.to_string()).or_default()
    }

    pub fn references_unit(&self, unit: &str) -> bool {
        self.applications.values().any(|state| state.knows(unit))
    }

    /// Remove a unit from every application's sets. Returns true if any
    /// set changed.
    pub fn forget_unit(&mut self, unit: &str) -> bool {
        let mut changed = false;
        for state in self.applications.values_mut() {
            changed |= state.forget(unit);
        }
        changed
    }
}

impl Document for Branch {
    const KIND: DocKind = DocKind::Branch;

    fn id(&self) -> String {
        self.name.clone()
    }
}
