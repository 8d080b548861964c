//! Transaction retry loop and assertion checking shared by the backends.

use super::{Change, DocKey, ModelStore, RawDoc, TxnOp, TxnStatus};
use crate::config::Config;
use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

/// Runs optimistic transactions with bounded retry.
#[derive(Debug, Clone, Copy)]
pub struct TxnRunner {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for TxnRunner {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TxnRunner {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.txn_max_attempts, config.txn_retry_backoff())
    }

    /// Build and apply a transaction until it commits.
    ///
    /// `build` is called once per attempt (starting at 0) and must read the
    /// state it depends on afresh. An error from `build` ends the loop
    /// immediately; an empty op list is a successful no-op. When every
    /// attempt aborts, the result is `Conflict` naming `what`.
    pub fn run<F>(&self, store: &dyn ModelStore, what: &str, mut build: F) -> Result<()>
    where
        F: FnMut(u32) -> Result<Vec<TxnOp>>,
    {
        for attempt in 0..self.max_attempts {
            if attempt > 0 && !self.backoff.is_zero() {
                thread::sleep(self.backoff);
            }

            let ops = build(attempt)?;
            if ops.is_empty() {
                return Ok(());
            }

            match store.apply(&ops)? {
                TxnStatus::Committed => return Ok(()),
                TxnStatus::Aborted => continue,
            }
        }

        Err(FleetError::Conflict(what.to_string()))
    }
}

/// What a backend holds for one key, deletions included.
///
/// `version` never goes back down. Deleting a document keeps its version
/// as a tombstone and the next write continues from it, so an assertion
/// made against a deleted document can never match a later one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Slot {
    pub version: u64,

    /// `None` once the document has been deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

impl Slot {
    /// The live document, if any.
    pub fn live(&self) -> Option<RawDoc> {
        self.doc.as_ref().map(|doc| RawDoc {
            version: self.version,
            doc: doc.clone(),
        })
    }

    pub fn is_live(&self) -> bool {
        self.doc.is_some()
    }

    /// `(version, live)`, as [`resolve_writes`] wants it.
    pub fn revision(&self) -> (u64, bool) {
        (self.version, self.is_live())
    }
}

/// A write whose assertion has already been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub(crate) enum Write {
    Put { key: DocKey, doc: RawDoc },
    /// Leaves a tombstone at `version`.
    Delete { key: DocKey, version: u64 },
}

impl Write {
    /// The slot this write leaves behind.
    pub fn into_slot(self) -> (DocKey, Slot) {
        match self {
            Write::Put { key, doc } => (
                key,
                Slot {
                    version: doc.version,
                    doc: Some(doc.doc),
                },
            ),
            Write::Delete { key, version } => (key, Slot { version, doc: None }),
        }
    }
}

/// Check every assertion of `ops` against the stored slots and resolve
/// the writes they imply.
///
/// `slot_of` reports the slot for a key, tombstones included. Returns
/// `None` if any assertion fails. Writes carry their new version, so
/// applying the result twice leaves the same state as applying it once.
pub(crate) fn resolve_writes<F>(ops: &[TxnOp], mut slot_of: F) -> Result<Option<Vec<Write>>>
where
    F: FnMut(&DocKey) -> Result<Option<(u64, bool)>>,
{
    let mut seen = BTreeSet::new();
    let mut writes = Vec::new();

    for op in ops {
        if !seen.insert(&op.key) {
            return Err(FleetError::Internal(format!(
                "{} appears twice in one transaction",
                op.key
            )));
        }

        let slot = slot_of(&op.key)?;
        let live = slot.filter(|&(_, live)| live).map(|(version, _)| version);
        if !op.assert.holds(live) {
            return Ok(None);
        }

        match &op.change {
            Change::Keep => {}
            Change::Put(doc) => writes.push(Write::Put {
                key: op.key.clone(),
                doc: RawDoc {
                    version: slot.map_or(0, |(version, _)| version) + 1,
                    doc: doc.clone(),
                },
            }),
            Change::Delete => {
                if let Some(version) = live {
                    writes.push(Write::Delete {
                        key: op.key.clone(),
                        version,
                    });
                }
            }
        }
    }

    Ok(Some(writes))
}
