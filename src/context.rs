//! Model directory resolution for fleetctl.
//!
//! A model's control-plane state lives in a `.fleet/` directory. Commands may
//! be invoked from any subdirectory; resolution walks up from the working
//! directory to the nearest ancestor containing `.fleet/`, so every command
//! targets the same model regardless of where it is run.

use crate::error::{FleetError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the model directory.
pub const MODEL_DIR_NAME: &str = ".fleet";

/// Resolved paths for a model. All paths are absolute.
#[derive(Debug, Clone)]
pub struct ModelContext {
    /// Directory containing `.fleet/`.
    pub root: PathBuf,

    /// The model directory (`{root}/.fleet/`).
    pub model_dir: PathBuf,

    /// Document storage (`{root}/.fleet/state/`).
    pub state_dir: PathBuf,

    /// Lock files (`{root}/.fleet/locks/`).
    pub locks_dir: PathBuf,
}

impl ModelContext {
    /// Resolve the model context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            FleetError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Ok(Self::resolve_from(&cwd))
    }

    /// Resolve the model context from a specific directory.
    ///
    /// Uses the nearest ancestor that already holds a model directory, or
    /// `cwd` itself when none does (the `init` case).
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Self {
        let cwd = cwd.as_ref();
        let root = cwd
            .ancestors()
            .find(|dir| dir.join(MODEL_DIR_NAME).is_dir())
            .unwrap_or(cwd)
            .to_path_buf();

        Self::at(root)
    }

    /// Build the context for a known root directory.
    pub fn at(root: PathBuf) -> Self {
        let model_dir = root.join(MODEL_DIR_NAME);
        let state_dir = model_dir.join("state");
        let locks_dir = model_dir.join("locks");

        Self {
            root,
            model_dir,
            state_dir,
            locks_dir,
        }
    }

    /// Check if the model directory exists.
    pub fn model_exists(&self) -> bool {
        self.model_dir.is_dir() && self.state_dir.is_dir()
    }

    /// Ensure the model is initialized, returning an error if not.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.model_exists() {
            return Err(FleetError::UserError(format!(
                "no fleet model found.\n\
                 Expected model directory at: {}\n\n\
                 Run `fleetctl init` to create one.",
                self.model_dir.display()
            )));
        }

        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.model_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.model_dir.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Get the path to the model-wide transaction lock.
    pub fn txn_lock_path(&self) -> PathBuf {
        self.lock_path("txn")
    }

    /// Get the path to a named lock file.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.locks_dir.join(format!("{}.lock", name))
    }

    /// Get the path to the pending-transaction journal.
    pub fn journal_path(&self) -> PathBuf {
        self.state_dir.join("txn.journal")
    }
}

/// Resolve the context and ensure the model is initialized.
///
/// Use this in every command except `init`.
pub fn require_initialized_model() -> Result<ModelContext> {
    let ctx = ModelContext::resolve()?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}

/// Resolve the context without requiring initialization.
pub fn resolve_context() -> Result<ModelContext> {
    ModelContext::resolve()
}
