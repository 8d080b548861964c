//! Implementation of the `fleetctl init` command.
//!
//! Creates the model directory:
//!
//! ```text
//! .fleet/
//!   config.yaml
//!   state/      documents, one directory per kind
//!   locks/
//!   events/
//! ```
//!
//! Running it again leaves existing state alone and only fills in what is
//! missing.

use crate::config::Config;
use crate::context::{ModelContext, resolve_context};
use crate::error::{FleetError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write_file;
use crate::locks;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Execute the `fleetctl init` command.
pub fn cmd_init() -> Result<()> {
    let ctx = resolve_context()?;
    let existed = ctx.model_exists();

    create_model_structure(&ctx)?;

    // Serialize with any committer while writing the config.
    let lock_guard = locks::acquire_lock(&ctx.txn_lock_path(), "init")?;

    let config_created = create_config(&ctx)?;
    lock_guard.release()?;

    let event = Event::new(EventAction::Init).with_details(json!({
        "root": ctx.root.display().to_string(),
        "already_initialized": existed,
        "config_created": config_created,
    }));
    append_event(&ctx, &event)?;

    if existed {
        println!("Model already initialized at {}", ctx.model_dir.display());
    } else {
        println!("Initialized fleet model at {}", ctx.model_dir.display());
    }

    Ok(())
}

fn create_model_structure(ctx: &ModelContext) -> Result<()> {
    for dir in [&ctx.model_dir, &ctx.state_dir, &ctx.locks_dir, &ctx.events_dir()] {
        create_dir(dir)?;
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        FleetError::UserError(format!(
            "failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Write the default config if there is none. Returns whether it was
/// written.
fn create_config(ctx: &ModelContext) -> Result<bool> {
    let config_path = ctx.config_path();
    if config_path.exists() {
        // Surface a broken config now rather than on the next command.
        Config::load(&config_path)?;
        return Ok(false);
    }

    let yaml = Config::default().to_yaml()?;
    atomic_write_file(&config_path, &yaml)?;
    Ok(true)
}
