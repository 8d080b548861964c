//! Typed access to branch documents.

use super::{ModelStore, StoreExt, TxnOp, TxnRunner, Versioned};
use crate::error::{FleetError, Result};
use crate::model::{Branch, MODEL_DOC_ID, ModelDoc};

/// Branch CRUD over a [`ModelStore`].
///
/// Creating and deleting a branch also updates the active-branch set in the
/// [`ModelDoc`], in the same transaction.
pub struct BranchStore<'a> {
    store: &'a dyn ModelStore,
    runner: TxnRunner,
    max_active: u32,
}

impl<'a> BranchStore<'a> {
    pub fn new(store: &'a dyn ModelStore, runner: TxnRunner) -> Self {
        Self {
            store,
            runner,
            max_active: u32::MAX,
        }
    }

    /// Limit how many branches may exist at once.
    pub fn with_max_active(mut self, max_active: u32) -> Self {
        self.max_active = max_active;
        self
    }

    pub fn get(&self, name: &str) -> Result<Branch> {
        Ok(self.get_versioned(name)?.doc)
    }

    pub fn get_versioned(&self, name: &str) -> Result<Versioned<Branch>> {
        self.store.require::<Branch>(name)
    }

    /// All branches, ordered by name.
    pub fn list(&self) -> Result<Vec<Branch>> {
        Ok(self
            .store
            .list::<Branch>()?
            .into_iter()
            .map(|v| v.doc)
            .collect())
    }

    pub fn create(&self, branch: &Branch) -> Result<()> {
        let what = format!("create branch {:?}", branch.name);
        self.runner.run(self.store, &what, |_| {
            if self.store.get::<Branch>(&branch.name)?.is_some() {
                return Err(FleetError::AlreadyExists(format!("branch {:?}", branch.name)));
            }

            let model = self.store.get::<ModelDoc>(MODEL_DOC_ID)?;
            let mut doc = model.as_ref().map(|m| m.doc.clone()).unwrap_or_default();

            if doc.active_branches.len() >= self.max_active as usize {
                let active = doc.active_branches.iter().next().cloned().unwrap_or_default();
                return Err(FleetError::AlreadyExists(format!("active branch {:?}", active)));
            }
            doc.active_branches.insert(branch.name.clone());

            Ok(vec![
                TxnOp::insert(branch)?,
                TxnOp::put(model.as_ref().map(|m| m.version), &doc)?,
            ])
        })
    }

    /// Read-modify-write a branch.
    ///
    /// `mutate` runs against a fresh copy on every attempt. If it leaves the
    /// branch unchanged nothing is written. Returns the branch as stored.
    pub fn update<F>(&self, name: &str, mut mutate: F) -> Result<Branch>
    where
        F: FnMut(&mut Branch) -> Result<()>,
    {
        self.update_guarded(name, |branch| {
            mutate(branch)?;
            Ok(Vec::new())
        })
    }

    /// Like [`update`](Self::update), but `mutate` also returns assertions
    /// on the other documents its change was derived from. They are
    /// committed together with the branch write.
    pub fn update_guarded<F>(&self, name: &str, mut mutate: F) -> Result<Branch>
    where
        F: FnMut(&mut Branch) -> Result<Vec<TxnOp>>,
    {
        let mut stored = None;
        let what = format!("update branch {:?}", name);

        self.runner.run(self.store, &what, |_| {
            let current = self.get_versioned(name)?;
            let mut branch = current.doc.clone();
            let guards = mutate(&mut branch)?;

            let ops = if branch == current.doc {
                Vec::new()
            } else {
                let mut ops = vec![TxnOp::update(current.version, &branch)?];
                ops.extend(guards);
                ops
            };

            stored = Some(branch);
            Ok(ops)
        })?;

        stored.ok_or_else(|| FleetError::Internal(format!("{}: no attempt ran", what)))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let what = format!("delete branch {:?}", name);
        self.runner.run(self.store, &what, |_| {
            let current = self.get_versioned(name)?;
            self.delete_ops(&current)
        })
    }

    /// Ops deleting a branch read at `current.version`.
    pub fn delete_ops(&self, current: &Versioned<Branch>) -> Result<Vec<TxnOp>> {
        let name = &current.doc.name;
        let mut ops = vec![TxnOp::delete::<Branch>(name, current.version)];

        if let Some(model) = self.store.get::<ModelDoc>(MODEL_DOC_ID)? {
            let mut doc = model.doc.clone();
            if doc.active_branches.remove(name) {
                ops.push(TxnOp::update(model.version, &doc)?);
            }
        }

        Ok(ops)
    }
}
