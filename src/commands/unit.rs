//! `fleetctl unit` subcommands.

use super::Session;
use crate::cli::{UnitAction, UnitAddArgs, UnitCommand};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::model::Unit;
use crate::registry::Registry;
use crate::store::TxnRunner;
use serde_json::json;

pub fn dispatch(cmd: UnitCommand) -> Result<()> {
    match cmd.action {
        UnitAction::Add(args) => cmd_unit_add(args),
        UnitAction::List => cmd_unit_list(),
    }
}

fn cmd_unit_add(args: UnitAddArgs) -> Result<()> {
    let session = Session::open()?;

    let mut unit = Unit::new(&args.unit);
    for id in args.storage {
        unit = unit.with_storage(id);
    }

    Registry::new(&session.store, TxnRunner::from_config(&session.config)).add_unit(&unit)?;

    session.record(
        Event::new(EventAction::UnitAdd)
            .with_subject(&unit.name)
            .with_details(json!({ "storage": unit.storage_attachments })),
    );

    println!("Added unit {}", unit.name);
    Ok(())
}

fn cmd_unit_list() -> Result<()> {
    let session = Session::open()?;
    let units = Registry::new(&session.store, TxnRunner::from_config(&session.config)).units()?;

    if units.is_empty() {
        println!("No units.");
        return Ok(());
    }

    for unit in &units {
        if unit.storage_attachments.is_empty() {
            println!("{:<24} {}", unit.name, unit.life);
        } else {
            println!(
                "{:<24} {:<6} storage: {}",
                unit.name,
                unit.life,
                unit.storage_attachments.join(", ")
            );
        }
    }

    Ok(())
}
