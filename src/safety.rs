//! Safety blocks: operator-imposed switches that refuse classes of
//! operations model-wide.
//!
//! [`SafetyGate`] only reads. [`BlockAdmin`] turns blocks on and off with
//! compare-and-swap writes, one document per kind.

use crate::error::{FleetError, Result};
use crate::model::{BlockKind, SafetyBlock};
use crate::store::{ModelStore, StoreExt, TxnOp, TxnRunner};

pub struct SafetyGate<'a> {
    store: &'a dyn ModelStore,
}

impl<'a> SafetyGate<'a> {
    pub fn new(store: &'a dyn ModelStore) -> Self {
        Self { store }
    }

    /// Fail with `Blocked` if a block of `kind`, or an `All` block, is
    /// active. A specific-kind block is reported before `All`.
    pub fn check_block(&self, kind: BlockKind) -> Result<()> {
        let mut kinds = vec![kind];
        if kind != BlockKind::All {
            kinds.push(BlockKind::All);
        }

        for kind in kinds {
            if let Some(block) = self.store.get::<SafetyBlock>(kind.as_str())?
                && block.doc.active
            {
                return Err(FleetError::Blocked(block.doc.message));
            }
        }

        Ok(())
    }
}

pub struct BlockAdmin<'a> {
    store: &'a dyn ModelStore,
    runner: TxnRunner,
}

impl<'a> BlockAdmin<'a> {
    pub fn new(store: &'a dyn ModelStore, runner: TxnRunner) -> Self {
        Self { store, runner }
    }

    /// Activate (or re-message) the block for `kind`.
    pub fn enable(&self, kind: BlockKind, message: &str) -> Result<()> {
        let block = SafetyBlock {
            kind,
            message: message.to_string(),
            active: true,
        };
        self.write(block)
    }

    /// Deactivate the block for `kind`. Disabling an inactive or missing
    /// block is a no-op.
    pub fn disable(&self, kind: BlockKind) -> Result<()> {
        let block = SafetyBlock {
            kind,
            message: String::new(),
            active: false,
        };
        self.write(block)
    }

    /// Active blocks, in kind order.
    pub fn list_active(&self) -> Result<Vec<SafetyBlock>> {
        let mut active = Vec::new();
        for kind in BlockKind::ALL_KINDS {
            if let Some(block) = self.store.get::<SafetyBlock>(kind.as_str())?
                && block.doc.active
            {
                active.push(block.doc);
            }
        }
        Ok(active)
    }

    fn write(&self, block: SafetyBlock) -> Result<()> {
        let what = format!("{} block", block.kind);
        self.runner.run(self.store, &what, |_| {
            let current = self.store.get::<SafetyBlock>(block.kind.as_str())?;

            match &current {
                Some(c) if c.doc == block => Ok(Vec::new()),
                None if !block.active => Ok(Vec::new()),
                _ => Ok(vec![TxnOp::put(current.as_ref().map(|c| c.version), &block)?]),
            }
        })
    }
}
