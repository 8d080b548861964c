//! Branch progress computation.
//!
//! Pure functions over branch state; nothing here reads or writes the store.
//! The lifecycle layer uses them to build summaries and the CLI renders the
//! summaries as YAML.

use crate::error::{FleetError, Result};
use crate::model::names::compare_unit_names;
use crate::model::{AppBranchState, Branch, ConfigValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Which units of one application are and are not tracking a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitDetail {
    /// Naturally ordered (`a/2` before `a/10`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tracking: Vec<String>,

    /// Units still on the baseline. Naturally ordered.
    #[serde(rename = "incomplete", skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
}

/// One application's part of a branch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummary {
    pub application: String,
    pub progress: String,

    #[serde(rename = "units", skip_serializing_if = "Option::is_none")]
    pub unit_detail: Option<UnitDetail>,

    pub config: BTreeMap<String, ConfigValue>,
}

/// A branch as presented to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchSummary {
    pub created: String,

    #[serde(rename = "created-by")]
    pub created_by: String,

    pub applications: Vec<ApplicationSummary>,
}

/// Summaries keyed by branch name.
pub type BranchSummaries = BTreeMap<String, BranchSummary>;

/// `"2/5 units tracking"`.
pub fn progress(state: &AppBranchState) -> String {
    format!(
        "{}/{} units tracking",
        state.tracking.len(),
        state.known_units().len()
    )
}

pub fn unit_detail(state: &AppBranchState) -> UnitDetail {
    let mut tracking: Vec<String> = state.tracking.iter().cloned().collect();
    let mut pending: Vec<String> = state.pending.iter().cloned().collect();
    tracking.sort_by(|a, b| compare_unit_names(a, b));
    pending.sort_by(|a, b| compare_unit_names(a, b));

    UnitDetail { tracking, pending }
}

/// Verify that no unit is both tracking and pending.
pub fn check_partition(application: &str, state: &AppBranchState) -> Result<()> {
    if let Some(unit) = state.tracking.intersection(&state.pending).next() {
        return Err(FleetError::Internal(format!(
            "application {:?}: unit {:?} is both tracking and pending",
            application, unit
        )));
    }
    Ok(())
}

/// Summarize a branch. Applications appear in name order.
pub fn summarize(branch: &Branch, detail: bool) -> BranchSummary {
    let applications = branch
        .applications
        .iter()
        .map(|(name, state)| ApplicationSummary {
            application: name.clone(),
            progress: progress(state),
            unit_detail: detail.then(|| unit_detail(state)),
            config: state.config_delta.clone(),
        })
        .collect();

    BranchSummary {
        created: branch.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        created_by: branch.created_by.clone(),
        applications,
    }
}
