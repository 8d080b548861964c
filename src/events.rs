//! Event logging subsystem for fleetctl.
//!
//! Every mutating command appends one event to an append-only NDJSON audit
//! log at `.fleet/events/events.ndjson` after its transaction commits. The
//! log is the operational record of who changed what in the model; it is
//! never read back to reconstruct state.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what was done (`branch_commit`, `remove_unit`, ...)
//! - `actor`: `user@HOST`
//! - `subject`: the branch, unit, application, or block concerned (optional)
//! - `details`: freeform object with action-specific details

use crate::context::ModelContext;
use crate::error::{FleetError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Model directory initialized
    Init,
    /// Application registered
    AppAdd,
    /// Unit registered
    UnitAdd,
    /// Baseline configuration changed
    ConfigSet,
    /// Branch created
    BranchAdd,
    /// Units set to track a branch
    BranchTrack,
    /// Branch configuration delta changed
    BranchConfig,
    /// Branch merged into the baseline
    BranchCommit,
    /// Branch discarded
    BranchAbort,
    /// Unit removal batch
    RemoveUnit,
    /// Safety block enabled
    BlockEnable,
    /// Safety block disabled
    BlockDisable,
    /// Lock cleared manually
    LockClear,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventAction::Init => "init",
            EventAction::AppAdd => "app_add",
            EventAction::UnitAdd => "unit_add",
            EventAction::ConfigSet => "config_set",
            EventAction::BranchAdd => "branch_add",
            EventAction::BranchTrack => "branch_track",
            EventAction::BranchConfig => "branch_config",
            EventAction::BranchCommit => "branch_commit",
            EventAction::BranchAbort => "branch_abort",
            EventAction::RemoveUnit => "remove_unit",
            EventAction::BlockEnable => "block_enable",
            EventAction::BlockDisable => "block_disable",
            EventAction::LockClear => "lock_clear",
        };
        f.write_str(s)
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// When the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who performed it (`user@HOST`).
    pub actor: String,

    /// The entity acted on, if there is a single one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Action-specific details.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            subject: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the subject for this event.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            FleetError::Internal(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// `user@HOST` for the current process, used for events, lock metadata,
/// and branch `created_by`.
pub fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the model's events log.
///
/// The file and directory are created on first use. Each call writes exactly
/// one line and syncs it to disk.
pub fn append_event(ctx: &ModelContext, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            FleetError::Internal(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let events_file = ctx.events_file();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            FleetError::Internal(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        FleetError::Internal(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        FleetError::Internal(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}
