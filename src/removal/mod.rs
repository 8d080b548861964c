//! Batch unit removal.
//!
//! A batch is gated once by the `remove` safety block. Past the gate, each
//! named unit is handled in its own transaction and gets its own outcome,
//! so one bad name never stops the rest of the batch.


use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::model::names::validate_unit_name;
use crate::model::{BlockKind, Branch, Life, Unit};
use crate::safety::SafetyGate;
use crate::store::{ModelStore, StoreExt, TxnOp, TxnRunner};
use std::fmt;

/// Why one unit could not be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NotFound,
    /// Retries exhausted; removing the unit again may succeed.
    Conflict,
    Error(String),
}

/// Result for one unit of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Removed,
    /// Marked Dying; these attachments, in attachment order, go with it.
    RemovedWithStorage(Vec<String>),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRemoval {
    pub unit: String,
    pub outcome: Outcome,
}

impl UnitRemoval {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}

impl fmt::Display for UnitRemoval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Removed => write!(f, "removing unit {}", self.unit),
            Outcome::RemovedWithStorage(ids) => {
                write!(f, "removing unit {}", self.unit)?;
                for id in ids {
                    write!(f, "\n- will remove storage {}", id)?;
                }
                Ok(())
            }
            Outcome::Failed(reason) => {
                let detail = match reason {
                    FailureReason::NotFound => format!("unit {:?} does not exist", self.unit),
                    FailureReason::Conflict => {
                        "state changing too quickly; try again soon".to_string()
                    }
                    FailureReason::Error(message) => message.clone(),
                };
                write!(f, "removing unit {} failed: {}", self.unit, detail)
            }
        }
    }
}

/// Result of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReport {
    /// One entry per requested name, in request order.
    Completed(Vec<UnitRemoval>),
    /// An active block refused the batch; nothing was changed.
    BatchBlocked(String),
}

pub struct RemovalOrchestrator<'a> {
    store: &'a dyn ModelStore,
    runner: TxnRunner,
}

impl<'a> RemovalOrchestrator<'a> {
    pub fn new(store: &'a dyn ModelStore, config: &Config) -> Self {
        Self {
            store,
            runner: TxnRunner::from_config(config),
        }
    }

    pub fn with_runner(mut self, runner: TxnRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Mark units Dying and drop them from every branch.
    ///
    /// The only error is failing to read the safety blocks; everything
    /// after the gate is reported per unit.
    pub fn remove_units<S: AsRef<str>>(&self, names: &[S]) -> Result<RemovalReport> {
        match SafetyGate::new(self.store).check_block(BlockKind::Remove) {
            Ok(()) => {}
            Err(FleetError::Blocked(message)) => return Ok(RemovalReport::BatchBlocked(message)),
            Err(e) => return Err(e),
        }

        let removals = names
            .iter()
            .map(|name| {
                let unit = name.as_ref();
                UnitRemoval {
                    unit: unit.to_string(),
                    outcome: self.remove_unit(unit),
                }
            })
            .collect();

        Ok(RemovalReport::Completed(removals))
    }

    fn remove_unit(&self, name: &str) -> Outcome {
        if validate_unit_name(name).is_err() {
            return Outcome::Failed(FailureReason::NotFound);
        }

        let mut storage = Vec::new();
        let what = format!("remove unit {:?}", name);

        let result = self.runner.run(self.store, &what, |_| {
            let unit = self.store.require::<Unit>(name)?;
            storage = unit.doc.storage_attachments.clone();

            let mut ops = Vec::new();
            if unit.doc.life == Life::Alive {
                let mut dying = unit.doc.clone();
                dying.life = Life::Dying;
                ops.push(TxnOp::update(unit.version, &dying)?);
            } else {
                ops.push(TxnOp::check::<Unit>(name, Some(unit.version)));
            }

            // Branches that do not reference the unit are asserted too, so
            // a concurrent assignment cannot slip it back in.
            for branch in self.store.list::<Branch>()? {
                if branch.doc.references_unit(name) {
                    let mut updated = branch.doc.clone();
                    updated.forget_unit(name);
                    ops.push(TxnOp::update(branch.version, &updated)?);
                } else {
                    ops.push(TxnOp::check::<Branch>(&branch.doc.name, Some(branch.version)));
                }
            }

            Ok(ops)
        });

        match result {
            Ok(()) if storage.is_empty() => Outcome::Removed,
            Ok(()) => Outcome::RemovedWithStorage(storage),
            Err(FleetError::NotFound(_)) => Outcome::Failed(FailureReason::NotFound),
            Err(FleetError::Conflict(_)) => Outcome::Failed(FailureReason::Conflict),
            Err(e) => Outcome::Failed(FailureReason::Error(e.to_string())),
        }
    }
}
