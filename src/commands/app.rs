//! `fleetctl app` subcommands.

use super::{Session, split_assignment};
use crate::cli::{AppAction, AppAddArgs, AppCommand};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::model::{Application, OptionType};
use crate::registry::Registry;
use crate::store::TxnRunner;
use serde_json::json;

pub fn dispatch(cmd: AppCommand) -> Result<()> {
    match cmd.action {
        AppAction::Add(args) => cmd_app_add(args),
        AppAction::List => cmd_app_list(),
    }
}

fn cmd_app_add(args: AppAddArgs) -> Result<()> {
    let session = Session::open()?;

    let mut app = Application::new(&args.name);
    for option in &args.options {
        let (key, ty) = split_assignment(option, "KEY=TYPE")?;
        app = app.with_option(key, ty.parse::<OptionType>()?);
    }

    Registry::new(&session.store, TxnRunner::from_config(&session.config)).add_application(&app)?;

    session.record(
        Event::new(EventAction::AppAdd)
            .with_subject(&app.name)
            .with_details(json!({ "options": app.options })),
    );

    println!("Added application {}", app.name);
    Ok(())
}

fn cmd_app_list() -> Result<()> {
    let session = Session::open()?;
    let apps = Registry::new(&session.store, TxnRunner::from_config(&session.config)).applications()?;

    if apps.is_empty() {
        println!("No applications.");
        return Ok(());
    }

    for app in &apps {
        if app.options.is_empty() {
            println!("{}", app.name);
        } else {
            let options: Vec<String> = app
                .options
                .iter()
                .map(|(key, ty)| format!("{}={}", key, ty))
                .collect();
            println!("{}  ({})", app.name, options.join(", "));
        }
    }

    Ok(())
}
