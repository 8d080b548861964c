//! Lock acquisition, listing, and clearing operations.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use super::types::LockInfo;
use crate::context::ModelContext;
use crate::error::{FleetError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Try to take a lock file using create_new semantics.
///
/// Returns `Ok(None)` when another holder already owns the lock, so callers
/// that treat contention as retryable can do so without string matching.
pub fn try_acquire_lock(lock_path: &Path, action: &str) -> Result<Option<LockGuard>> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            FleetError::LockError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(FleetError::LockError(format!(
                "failed to acquire lock '{}': {}",
                lock_path.display(),
                e
            )));
        }
    };

    let json = LockMetadata::new(action).to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        FleetError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        FleetError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(Some(LockGuard::new(lock_path.to_path_buf())))
}

/// Take a lock file, failing with `LockError` if it is already held.
pub fn acquire_lock(lock_path: &Path, action: &str) -> Result<LockGuard> {
    match try_acquire_lock(lock_path, action)? {
        Some(guard) => Ok(guard),
        None => {
            let existing_info = match LockMetadata::from_file(lock_path) {
                Ok(meta) => format!(
                    "\nLock: {} (created {} ago by {})\nAction: {}",
                    lock_path.display(),
                    meta.age_string(),
                    meta.owner,
                    meta.action
                ),
                Err(_) => format!("\nLock: {}", lock_path.display()),
            };
            Err(FleetError::LockError(format!(
                "lock is held by another process{}",
                existing_info
            )))
        }
    }
}

/// List all lock files in the model, sorted by name.
pub fn list_locks(ctx: &ModelContext, stale_minutes: u32) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !ctx.locks_dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        FleetError::Internal(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            FleetError::Internal(format!("failed to read locks directory entry: {}", e))
        })?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        // Skip files that are mid-write or not ours.
        let metadata = match LockMetadata::from_file(&path) {
            Ok(meta) => meta,
            Err(_) => continue,
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let is_stale = metadata.is_stale(stale_minutes);

        locks.push(LockInfo {
            path,
            name,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(locks)
}

/// Remove a lock file by name.
///
/// The caller is responsible for deciding that clearing is appropriate
/// (the CLI requires `--force`).
pub fn clear_lock(ctx: &ModelContext, name: &str, stale_minutes: u32) -> Result<LockInfo> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(FleetError::InvalidArgument(format!("lock name {:?}", name)));
    }

    let lock_path = ctx.lock_path(name);
    if !lock_path.exists() {
        return Err(FleetError::not_found("lock", name));
    }

    let metadata = LockMetadata::from_file(&lock_path)?;
    let is_stale = metadata.is_stale(stale_minutes);

    fs::remove_file(&lock_path).map_err(|e| {
        FleetError::LockError(format!(
            "failed to clear lock '{}': {}",
            lock_path.display(),
            e
        ))
    })?;

    Ok(LockInfo {
        path: lock_path,
        name: name.to_string(),
        metadata,
        is_stale,
    })
}
