//! Implementation of the `fleetctl config` command.

use super::{Session, parse_settings};
use crate::cli::ConfigArgs;
use crate::error::{FleetError, Result};
use crate::events::{Event, EventAction};
use crate::lifecycle::LifecycleController;
use crate::model::{Application, BASELINE_BRANCH, ConfigValue};
use crate::store::StoreExt;
use serde_json::json;
use std::collections::BTreeMap;

pub fn cmd_config(args: ConfigArgs) -> Result<()> {
    let session = Session::open()?;

    // `--branch master` means the baseline.
    let branch = args.branch.as_deref().filter(|b| *b != BASELINE_BRANCH);

    if args.settings.is_empty() {
        return show_config(&session, &args.app, branch);
    }

    let settings = parse_settings(&args.settings)?;
    let lifecycle = LifecycleController::new(&session.store, &session.config);
    let keys: Vec<&str> = settings.iter().map(|(key, _)| key.as_str()).collect();

    match branch {
        Some(branch) => {
            lifecycle.set_configs(branch, &args.app, &settings)?;
            session.record(
                Event::new(EventAction::BranchConfig)
                    .with_subject(branch)
                    .with_details(json!({ "application": args.app, "set": keys })),
            );
            println!("Staged {} setting(s) for {} on branch {:?}", keys.len(), args.app, branch);
        }
        None => {
            lifecycle.set_baseline_config(&args.app, &settings)?;
            session.record(
                Event::new(EventAction::ConfigSet)
                    .with_subject(&args.app)
                    .with_details(json!({ "set": keys })),
            );
            println!("Updated {} setting(s) for {}", keys.len(), args.app);
        }
    }

    Ok(())
}

/// Print the baseline, or the baseline overlaid with a branch's delta.
fn show_config(session: &Session, app: &str, branch: Option<&str>) -> Result<()> {
    let application = session.store.require::<Application>(app)?.doc;
    let mut config: BTreeMap<String, ConfigValue> = application.config;

    if let Some(branch) = branch {
        let branch = LifecycleController::new(&session.store, &session.config).get(branch)?;
        if let Some(state) = branch.applications.get(app) {
            config.extend(state.config_delta.clone());
        }
    }

    if config.is_empty() {
        println!("No configuration set for {}.", app);
        return Ok(());
    }

    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| FleetError::Internal(format!("failed to render configuration: {}", e)))?;
    print!("{}", yaml);
    Ok(())
}
