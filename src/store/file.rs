//! File-backed store under `.fleet/state/`.
//!
//! Layout:
//!
//! ```text
//! .fleet/state/
//!   branch/canary.json          {"version": 3, "doc": {...}}
//!   branch/hotfix.json          {"version": 5}  (deleted, version kept)
//!   unit/mysql%2F0.json
//!   block/remove.json
//!   txn.journal                 present only while a commit is in flight
//! ```
//!
//! A deleted document leaves a tombstone holding its last version, so
//! versions of a key only ever increase.
//!
//! Every commit runs under the model-wide `txn` lock. Once a transaction's
//! assertions pass, its resolved writes are journaled, applied file by file
//! with atomic replacement, and the journal is removed. A journal left by a
//! crashed process is rolled forward by the next committer (or by
//! [`FileStore::open`]), so a transaction is never observed half-applied
//! after recovery.

use super::txn::{Slot, Write, resolve_writes};
use super::{DocKey, DocKind, ModelStore, RawDoc, TxnOp, TxnStatus};
use crate::context::ModelContext;
use crate::error::{FleetError, Result};
use crate::fs::atomic_write;
use crate::locks::try_acquire_lock;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStore {
    state_dir: PathBuf,
    lock_path: PathBuf,
    journal_path: PathBuf,
}

impl FileStore {
    /// Open the store of an initialized model, recovering an interrupted
    /// commit if no other process is committing.
    pub fn open(ctx: &ModelContext) -> Result<Self> {
        let store = Self {
            state_dir: ctx.state_dir.clone(),
            lock_path: ctx.txn_lock_path(),
            journal_path: ctx.journal_path(),
        };

        if store.journal_path.exists()
            && let Some(_guard) = try_acquire_lock(&store.lock_path, "recover")?
        {
            store.roll_forward()?;
        }

        Ok(store)
    }

    fn doc_path(&self, key: &DocKey) -> PathBuf {
        self.state_dir
            .join(key.kind.as_str())
            .join(format!("{}.json", escape_id(&key.id)))
    }

    fn read_slot(&self, key: &DocKey) -> Result<Option<Slot>> {
        Self::read_path(&self.doc_path(key))
    }

    fn read_path(path: &Path) -> Result<Option<Slot>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FleetError::Internal(format!(
                    "failed to read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            FleetError::Internal(format!("corrupt document '{}': {}", path.display(), e))
        })
    }

    /// Re-apply a pending journal, then remove it. Caller holds the lock.
    fn roll_forward(&self) -> Result<()> {
        let content = match fs::read_to_string(&self.journal_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(FleetError::Internal(format!(
                    "failed to read transaction journal '{}': {}",
                    self.journal_path.display(),
                    e
                )));
            }
        };

        let writes: Vec<Write> = serde_json::from_str(&content).map_err(|e| {
            FleetError::Internal(format!(
                "corrupt transaction journal '{}': {}",
                self.journal_path.display(),
                e
            ))
        })?;

        self.apply_writes(&writes)?;
        self.remove_journal()
    }

    fn apply_writes(&self, writes: &[Write]) -> Result<()> {
        for write in writes {
            let (key, slot) = write.clone().into_slot();
            let json = serde_json::to_vec_pretty(&slot)?;
            atomic_write(self.doc_path(&key), &json)?;
        }
        Ok(())
    }

    fn remove_journal(&self) -> Result<()> {
        match fs::remove_file(&self.journal_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FleetError::Internal(format!(
                "failed to remove transaction journal '{}': {}",
                self.journal_path.display(),
                e
            ))),
        }
    }
}

impl ModelStore for FileStore {
    fn read(&self, key: &DocKey) -> Result<Option<RawDoc>> {
        Ok(self.read_slot(key)?.and_then(|slot| slot.live()))
    }

    fn list_ids(&self, kind: DocKind) -> Result<Vec<String>> {
        let dir = self.state_dir.join(kind.as_str());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(FleetError::Internal(format!(
                    "failed to read '{}': {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                FleetError::Internal(format!("failed to read '{}': {}", dir.display(), e))
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            // Temp files from atomic writes start with a dot.
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json")
                && let Some(id) = unescape_id(stem)
                && Self::read_path(&entry.path())?.is_some_and(|slot| slot.is_live())
            {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn apply(&self, ops: &[TxnOp]) -> Result<TxnStatus> {
        // Another committer holds the lock: report it like any other
        // conflict so the runner retries.
        let Some(guard) = try_acquire_lock(&self.lock_path, "txn")? else {
            return Ok(TxnStatus::Aborted);
        };

        if self.journal_path.exists() {
            self.roll_forward()?;
        }

        let resolved = resolve_writes(ops, |key| Ok(self.read_slot(key)?.map(|slot| slot.revision())))?;
        let Some(writes) = resolved else {
            return Ok(TxnStatus::Aborted);
        };

        if !writes.is_empty() {
            let journal = serde_json::to_vec(&writes)?;
            atomic_write(&self.journal_path, &journal)?;
            self.apply_writes(&writes)?;
            self.remove_journal()?;
        }

        drop(guard);
        Ok(TxnStatus::Committed)
    }
}

/// Escape a document id into a file stem.
///
/// Bytes outside `[A-Za-z0-9_.-]`, and a leading `.`, become `%XX`.
fn escape_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (i, b) in id.bytes().enumerate() {
        let plain = b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || (b == b'.' && i > 0);
        if plain {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn unescape_id(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_id() {
        assert_eq!(escape_id("canary"), "canary");
        assert_eq!(escape_id("mysql/0"), "mysql%2F0");
        assert_eq!(escape_id("100%"), "100%25");
        assert_eq!(escape_id(".hidden"), "%2Ehidden");
        assert_eq!(escape_id("v1.2"), "v1.2");
        assert_eq!(escape_id("a b"), "a%20b");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        for id in ["canary", "mysql/0", "100%", ".hidden", "naïve", "x/../y"] {
            assert_eq!(unescape_id(&escape_id(id)).as_deref(), Some(id));
        }
    }

    #[test]
    fn test_unescape_rejects_truncated_escape() {
        assert_eq!(unescape_id("bad%2"), None);
        assert_eq!(unescape_id("bad%zz"), None);
    }
}
