//! Transactional document store.
//!
//! All model state (applications, units, branches, safety blocks, and the
//! model document) is held as versioned JSON documents. The only way to
//! change a document is a multi-document transaction: a list of [`TxnOp`]s,
//! each asserting something about the current version of one document and
//! optionally replacing or deleting it. A store applies every op of a
//! transaction or none of them.
//!
//! Callers never hold a document across transactions. They read with a
//! version token, build ops that assert those versions, and let
//! [`TxnRunner`] rebuild from fresh reads when a concurrent writer got
//! there first.
//!
//! Two backends are provided: [`MemoryStore`] for tests and embedding, and
//! [`FileStore`] for the `.fleet/state/` directory used by the CLI.

mod branches;
mod file;
mod memory;
mod txn;

#[cfg(test)]
mod tests;

pub use branches::BranchStore;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use txn::TxnRunner;

use crate::error::{FleetError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Model,
    Application,
    Unit,
    Branch,
    Block,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Model => "model",
            DocKind::Application => "application",
            DocKind::Unit => "unit",
            DocKind::Branch => "branch",
            DocKind::Block => "block",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocKey {
    pub kind: DocKind,
    pub id: String,
}

impl DocKey {
    pub fn new(kind: DocKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn of<T: Document>(id: impl Into<String>) -> Self {
        Self::new(T::KIND, id)
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.id)
    }
}

/// A typed document that lives in one collection.
pub trait Document: Serialize + DeserializeOwned + Clone {
    const KIND: DocKind;

    /// Key within the collection.
    fn id(&self) -> String;

    fn key(&self) -> DocKey {
        DocKey::new(Self::KIND, self.id())
    }
}

/// A live document as the backends return it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDoc {
    /// Starts at 1 and increases by one on every write. Deleting and
    /// recreating a document continues the count.
    pub version: u64,
    pub doc: Value,
}

/// A decoded document with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub doc: T,
}

/// Precondition on a document's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assert {
    Any,
    Missing,
    /// Present, at exactly this version.
    Version(u64),
}

impl Assert {
    /// `Missing` for `None`, `Version` otherwise.
    pub fn expected(version: Option<u64>) -> Self {
        match version {
            Some(v) => Assert::Version(v),
            None => Assert::Missing,
        }
    }

    pub fn holds(&self, current: Option<u64>) -> bool {
        match self {
            Assert::Any => true,
            Assert::Missing => current.is_none(),
            Assert::Version(v) => current == Some(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Keep,
    Put(Value),
    Delete,
}

/// One operation of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxnOp {
    pub key: DocKey,
    pub assert: Assert,
    pub change: Change,
}

impl TxnOp {
    /// Create a document that must not exist yet.
    pub fn insert<T: Document>(doc: &T) -> Result<Self> {
        Self::put(None, doc)
    }

    /// Replace a document read at `version`.
    pub fn update<T: Document>(version: u64, doc: &T) -> Result<Self> {
        Self::put(Some(version), doc)
    }

    /// Write a document, asserting it is still at `expected` (or still
    /// missing, for `None`).
    pub fn put<T: Document>(expected: Option<u64>, doc: &T) -> Result<Self> {
        Ok(Self {
            key: doc.key(),
            assert: Assert::expected(expected),
            change: Change::Put(serde_json::to_value(doc)?),
        })
    }

    /// Delete a document read at `version`.
    pub fn delete<T: Document>(id: &str, version: u64) -> Self {
        Self {
            key: DocKey::of::<T>(id),
            assert: Assert::Version(version),
            change: Change::Delete,
        }
    }

    /// Assert a document is unchanged without writing it.
    pub fn check<T: Document>(id: &str, version: Option<u64>) -> Self {
        Self {
            key: DocKey::of::<T>(id),
            assert: Assert::expected(version),
            change: Change::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Committed,
    /// An assertion failed; nothing was written.
    Aborted,
}

/// Storage backend.
pub trait ModelStore: Send + Sync {
    fn read(&self, key: &DocKey) -> Result<Option<RawDoc>>;

    /// Ids of every document of `kind`, sorted.
    fn list_ids(&self, kind: DocKind) -> Result<Vec<String>>;

    /// Apply a transaction atomically.
    fn apply(&self, ops: &[TxnOp]) -> Result<TxnStatus>;
}

/// Typed reads over any [`ModelStore`].
pub trait StoreExt: ModelStore {
    fn get<T: Document>(&self, id: &str) -> Result<Option<Versioned<T>>> {
        let Some(raw) = self.read(&DocKey::of::<T>(id))? else {
            return Ok(None);
        };

        let doc = serde_json::from_value(raw.doc).map_err(|e| {
            FleetError::Internal(format!("corrupt {} document {:?}: {}", T::KIND, id, e))
        })?;

        Ok(Some(Versioned {
            version: raw.version,
            doc,
        }))
    }

    /// Like [`get`](StoreExt::get), but a missing document is `NotFound`.
    fn require<T: Document>(&self, id: &str) -> Result<Versioned<T>> {
        self.get(id)?
            .ok_or_else(|| FleetError::not_found(T::KIND.as_str(), id))
    }

    fn list<T: Document>(&self) -> Result<Vec<Versioned<T>>> {
        let mut docs = Vec::new();
        for id in self.list_ids(T::KIND)? {
            // Deleted between listing and reading.
            if let Some(doc) = self.get(&id)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

impl<S: ModelStore + ?Sized> StoreExt for S {}
