//! In-process store.

use super::txn::{Slot, resolve_writes};
use super::{DocKey, DocKind, Document, ModelStore, RawDoc, TxnOp, TxnStatus};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A store held in memory behind one mutex.
///
/// Transactions are serialized by the mutex, so concurrent callers on
/// different threads see the same conflict behaviour as separate processes
/// sharing a [`FileStore`](super::FileStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<DocKey, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document directly, bumping its version. Bypasses
    /// assertions; meant for setting up fixtures.
    pub fn seed<T: Document>(&self, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc)?;
        let mut docs = self.lock();
        let version = docs.get(&doc.key()).map_or(0, |slot| slot.version) + 1;
        docs.insert(
            doc.key(),
            Slot {
                version,
                doc: Some(value),
            },
        );
        Ok(())
    }

    // A panic while holding the lock cannot leave a half-applied
    // transaction, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<DocKey, Slot>> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ModelStore for MemoryStore {
    fn read(&self, key: &DocKey) -> Result<Option<RawDoc>> {
        Ok(self.lock().get(key).and_then(Slot::live))
    }

    fn list_ids(&self, kind: DocKind) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(key, slot)| key.kind == kind && slot.is_live())
            .map(|(key, _)| key.id.clone())
            .collect())
    }

    fn apply(&self, ops: &[TxnOp]) -> Result<TxnStatus> {
        let mut docs = self.lock();

        let Some(writes) = resolve_writes(ops, |key| Ok(docs.get(key).map(Slot::revision)))? else {
            return Ok(TxnStatus::Aborted);
        };

        for write in writes {
            let (key, slot) = write.into_slot();
            docs.insert(key, slot);
        }

        Ok(TxnStatus::Committed)
    }
}
