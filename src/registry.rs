//! Application and unit registration.
//!
//! Deployment and provisioning happen elsewhere; the model only records
//! that an application or unit exists so branches and removals have
//! something to act on.

use crate::error::{FleetError, Result};
use crate::model::names::{application_of, compare_unit_names, validate_application_name, validate_unit_name};
use crate::model::{Application, Unit};
use crate::store::{ModelStore, StoreExt, TxnOp, TxnRunner};

pub struct Registry<'a> {
    store: &'a dyn ModelStore,
    runner: TxnRunner,
}

impl<'a> Registry<'a> {
    pub fn new(store: &'a dyn ModelStore, runner: TxnRunner) -> Self {
        Self { store, runner }
    }

    pub fn add_application(&self, app: &Application) -> Result<()> {
        validate_application_name(&app.name)?;

        let what = format!("add application {:?}", app.name);
        self.runner.run(self.store, &what, |_| {
            if self.store.get::<Application>(&app.name)?.is_some() {
                return Err(FleetError::AlreadyExists(format!("application {:?}", app.name)));
            }
            Ok(vec![TxnOp::insert(app)?])
        })
    }

    /// Register an Alive unit. Its application must already exist.
    pub fn add_unit(&self, unit: &Unit) -> Result<()> {
        validate_unit_name(&unit.name)?;
        let app = application_of(&unit.name).unwrap_or_default();

        let what = format!("add unit {:?}", unit.name);
        self.runner.run(self.store, &what, |_| {
            let application = self.store.require::<Application>(app)?;
            if self.store.get::<Unit>(&unit.name)?.is_some() {
                return Err(FleetError::AlreadyExists(format!("unit {:?}", unit.name)));
            }
            Ok(vec![
                TxnOp::check::<Application>(app, Some(application.version)),
                TxnOp::insert(unit)?,
            ])
        })
    }

    pub fn applications(&self) -> Result<Vec<Application>> {
        Ok(self
            .store
            .list::<Application>()?
            .into_iter()
            .map(|v| v.doc)
            .collect())
    }

    /// Units, naturally ordered by name.
    pub fn units(&self) -> Result<Vec<Unit>> {
        let mut units: Vec<Unit> = self
            .store
            .list::<Unit>()?
            .into_iter()
            .map(|v| v.doc)
            .collect();
        units.sort_by(|a, b| compare_unit_names(&a.name, &b.name));
        Ok(units)
    }
}
