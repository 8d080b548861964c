//! Command implementations for fleetctl.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the plumbing they share: opening the model's
//! store, parsing `KEY=VALUE` arguments, and recording events.

mod app;
mod block;
mod branch;
mod config_cmd;
mod init;
mod lock;
mod remove_unit;
mod unit;


use crate::cli::Command;
use crate::config::Config;
use crate::context::{ModelContext, require_initialized_model};
use crate::error::{FleetError, Result};
use crate::events::{Event, append_event};
use crate::model::ConfigValue;
use crate::store::FileStore;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(),
        Command::App(cmd) => app::dispatch(cmd),
        Command::Unit(cmd) => unit::dispatch(cmd),
        Command::Branch(cmd) => branch::dispatch(cmd),
        Command::Config(args) => config_cmd::cmd_config(args),
        Command::RemoveUnit(args) => remove_unit::cmd_remove_unit(args),
        Command::Block(cmd) => block::dispatch(cmd),
        Command::Lock(cmd) => lock::dispatch(cmd),
    }
}

/// An opened model: where it lives, how it is configured, and its store.
pub(crate) struct Session {
    pub ctx: ModelContext,
    pub config: Config,
    pub store: FileStore,
}

impl Session {
    pub fn open() -> Result<Self> {
        let ctx = require_initialized_model()?;
        let config = Config::load_or_default(ctx.config_path())?;
        let store = FileStore::open(&ctx)?;
        Ok(Self { ctx, config, store })
    }

    /// Append an event for a change that has already committed.
    ///
    /// The change stands even if logging fails, so failure is a warning.
    pub fn record(&self, event: Event) {
        if let Err(e) = append_event(&self.ctx, &event) {
            eprintln!("Warning: failed to log {} event: {}", event.action, e);
        }
    }
}

/// Split `KEY=VALUE` at the first `=`.
pub(crate) fn split_assignment<'s>(arg: &'s str, what: &str) -> Result<(&'s str, &'s str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(FleetError::InvalidArgument(format!(
            "expected {}, got {:?}",
            what, arg
        ))),
    }
}

/// Parse `KEY=VALUE` settings, keeping their order.
pub(crate) fn parse_settings(args: &[String]) -> Result<Vec<(String, ConfigValue)>> {
    args.iter()
        .map(|arg| {
            let (key, value) = split_assignment(arg, "KEY=VALUE")?;
            Ok((key.to_string(), ConfigValue::parse(value)?))
        })
        .collect()
}
