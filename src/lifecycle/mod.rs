//! Branch lifecycle: create, assign units, stage config, commit, abort.
//!
//! Every operation is one optimistic transaction built from fresh reads.
//! Whenever a unit is added to a branch's tracking or pending set, the
//! transaction also asserts the version of that unit's document, and unit
//! removal asserts the version of every branch it inspects. Either side
//! committing first therefore forces the other to rebuild, so a branch never
//! ends up holding a unit that removal has already marked Dying.

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{FleetError, Result};
use crate::events::actor_string;
use crate::model::names::application_of;
use crate::model::{Application, BlockKind, Branch, ConfigValue, Unit, validate_branch_name};
use crate::safety::SafetyGate;
use crate::store::{BranchStore, ModelStore, StoreExt, TxnOp, TxnRunner, Versioned};
use crate::tracking::{self, BranchSummaries};
use std::collections::BTreeMap;

pub struct LifecycleController<'a> {
    store: &'a dyn ModelStore,
    runner: TxnRunner,
    max_active: u32,
    actor: String,
}

impl<'a> LifecycleController<'a> {
    pub fn new(store: &'a dyn ModelStore, config: &Config) -> Self {
        Self {
            store,
            runner: TxnRunner::from_config(config),
            max_active: config.max_active_branches,
            actor: actor_string(),
        }
    }

    /// Override the `created_by` recorded on new branches.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_runner(mut self, runner: TxnRunner) -> Self {
        self.runner = runner;
        self
    }

    fn branches(&self) -> BranchStore<'a> {
        BranchStore::new(self.store, self.runner).with_max_active(self.max_active)
    }

    fn gate(&self) -> SafetyGate<'a> {
        SafetyGate::new(self.store)
    }

    /// Create an empty branch.
    pub fn create(&self, name: &str) -> Result<Branch> {
        validate_branch_name(name)?;
        let branch = Branch::new(name, self.actor.clone());
        self.branches().create(&branch)?;
        Ok(branch)
    }

    pub fn get(&self, name: &str) -> Result<Branch> {
        self.branches().get(name)
    }

    /// Set one unit to track a branch. Idempotent.
    ///
    /// The application's other Alive units become known to the branch as
    /// pending.
    pub fn assign_unit(&self, branch: &str, app: &str, unit: &str) -> Result<Branch> {
        self.branches().update_guarded(branch, |b| {
            let target = self.store.require::<Unit>(unit)?;

            if application_of(unit) != Some(app) {
                return Err(FleetError::InvalidArgument(format!(
                    "unit {:?} does not belong to application {:?}",
                    unit, app
                )));
            }
            if !target.doc.is_alive() {
                return Err(FleetError::InvalidArgument(format!(
                    "unit {:?} is {}",
                    unit, target.doc.life
                )));
            }

            let mut observed = self.observe_units(b, app)?;
            observed.insert(unit.to_string(), target.version);
            b.app_mut(app).track(unit);

            Ok(unit_guards(observed))
        })
    }

    /// Set every Alive unit of an application to track a branch.
    pub fn assign_all_units(&self, branch: &str, app: &str) -> Result<Branch> {
        self.branches().update_guarded(branch, |b| {
            self.store.require::<Application>(app)?;

            let mut observed = BTreeMap::new();
            for unit in self.alive_units(app)? {
                b.app_mut(app).track(&unit.doc.name);
                observed.insert(unit.doc.name, unit.version);
            }

            Ok(unit_guards(observed))
        })
    }

    /// Stage a configuration change on a branch.
    pub fn set_config(&self, branch: &str, app: &str, key: &str, value: ConfigValue) -> Result<Branch> {
        self.set_configs(branch, app, &[(key.to_string(), value)])
    }

    /// Stage several changes at once. Every setting is checked against the
    /// application's options before any is staged.
    pub fn set_configs(&self, branch: &str, app: &str, settings: &[(String, ConfigValue)]) -> Result<Branch> {
        self.gate().check_block(BlockKind::Change)?;

        self.branches().update_guarded(branch, |b| {
            let application = self.store.require::<Application>(app)?;
            for (key, value) in settings {
                application.doc.check_setting(key, value).map_err(|reason| {
                    FleetError::InvalidArgument(format!("application {:?}: {}", app, reason))
                })?;
            }

            let observed = self.observe_units(b, app)?;
            let delta = &mut b.app_mut(app).config_delta;
            for (key, value) in settings {
                delta.insert(key.clone(), value.clone());
            }

            Ok(unit_guards(observed))
        })
    }

    /// Drop a staged configuration change. Absent keys are a no-op.
    pub fn reset_config(&self, branch: &str, app: &str, key: &str) -> Result<Branch> {
        self.reset_configs(branch, app, &[key])
    }

    /// Drop several staged changes in one transaction.
    pub fn reset_configs<K: AsRef<str>>(&self, branch: &str, app: &str, keys: &[K]) -> Result<Branch> {
        self.gate().check_block(BlockKind::Change)?;

        self.branches().update(branch, |b| {
            if let Some(state) = b.applications.get_mut(app) {
                for key in keys {
                    state.config_delta.remove(key.as_ref());
                }
            }
            Ok(())
        })
    }

    /// Change an application's baseline configuration directly, outside
    /// any branch. All settings are validated before any is applied.
    pub fn set_baseline_config(&self, app: &str, settings: &[(String, ConfigValue)]) -> Result<Application> {
        self.gate().check_block(BlockKind::Change)?;

        let mut stored = None;
        let what = format!("configure application {:?}", app);

        self.runner.run(self.store, &what, |_| {
            let current = self.store.require::<Application>(app)?;
            let delta: BTreeMap<String, ConfigValue> = settings.iter().cloned().collect();

            let mut updated = current.doc.clone();
            updated.merge_config(&delta).map_err(|reason| {
                FleetError::InvalidArgument(format!("application {:?}: {}", app, reason))
            })?;

            let ops = if updated == current.doc {
                Vec::new()
            } else {
                vec![TxnOp::update(current.version, &updated)?]
            };
            stored = Some(updated);
            Ok(ops)
        })?;

        stored.ok_or_else(|| FleetError::Internal(format!("{}: no attempt ran", what)))
    }

    /// Merge every application's delta into its baseline and delete the
    /// branch, all in one transaction.
    ///
    /// If any application cannot take its delta, nothing is written and
    /// the error names the first such application in name order.
    pub fn commit(&self, name: &str) -> Result<Branch> {
        self.gate().check_block(BlockKind::Change)?;

        let mut committed = None;
        let what = format!("commit branch {:?}", name);

        self.runner.run(self.store, &what, |_| {
            let current = self.branches().get_versioned(name)?;
            let mut ops = Vec::new();

            for (app_name, state) in &current.doc.applications {
                if state.config_delta.is_empty() {
                    continue;
                }

                let failed = |reason: String| FleetError::CommitFailed {
                    branch: name.to_string(),
                    application: app_name.clone(),
                    reason,
                };

                let app = self
                    .store
                    .get::<Application>(app_name)?
                    .ok_or_else(|| failed("application not found".to_string()))?;

                let mut merged = app.doc.clone();
                merged.merge_config(&state.config_delta).map_err(failed)?;

                if merged == app.doc {
                    ops.push(TxnOp::check::<Application>(app_name, Some(app.version)));
                } else {
                    ops.push(TxnOp::update(app.version, &merged)?);
                }
            }

            ops.extend(self.branches().delete_ops(&current)?);
            committed = Some(current.doc);
            Ok(ops)
        })?;

        committed.ok_or_else(|| FleetError::Internal(format!("{}: no attempt ran", what)))
    }

    /// Delete a branch without touching any baseline. Never blocked.
    pub fn abort(&self, name: &str) -> Result<()> {
        self.branches().delete(name)
    }

    /// Summaries for one branch, or for all of them.
    pub fn summaries(&self, name: Option<&str>, detail: bool) -> Result<BranchSummaries> {
        let branches = match name {
            Some(name) => vec![self.get(name)?],
            None => self.branches().list()?,
        };

        let mut summaries = BranchSummaries::new();
        for branch in branches {
            for (app, state) in &branch.applications {
                tracking::check_partition(app, state)?;
            }
            summaries.insert(branch.name.clone(), tracking::summarize(&branch, detail));
        }
        Ok(summaries)
    }

    fn alive_units(&self, app: &str) -> Result<Vec<Versioned<Unit>>> {
        Ok(self
            .store
            .list::<Unit>()?
            .into_iter()
            .filter(|u| u.doc.is_alive() && u.doc.application() == app)
            .collect())
    }

    /// Make every Alive unit of `app` known to the branch. Returns the
    /// versions of the units that were newly observed.
    fn observe_units(&self, branch: &mut Branch, app: &str) -> Result<BTreeMap<String, u64>> {
        let state = branch.app_mut(app);
        let mut observed = BTreeMap::new();

        for unit in self.alive_units(app)? {
            if !state.knows(&unit.doc.name) {
                state.observe(&unit.doc.name);
                observed.insert(unit.doc.name, unit.version);
            }
        }

        Ok(observed)
    }
}

fn unit_guards(observed: BTreeMap<String, u64>) -> Vec<TxnOp> {
    observed
        .iter()
        .map(|(name, version)| TxnOp::check::<Unit>(name, Some(*version)))
        .collect()
}
