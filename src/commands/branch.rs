//! `fleetctl branch` subcommands.

use super::{Session, parse_settings};
use crate::cli::{
    BranchAction, BranchCommand, BranchConfigArgs, BranchNameArgs, BranchResetArgs,
    BranchShowArgs, BranchTrackArgs,
};
use crate::error::{FleetError, Result};
use crate::events::{Event, EventAction};
use crate::lifecycle::LifecycleController;
use crate::model::Branch;
use crate::model::names::application_of;
use crate::tracking;
use serde_json::json;

pub fn dispatch(cmd: BranchCommand) -> Result<()> {
    match cmd.action {
        BranchAction::Add(args) => cmd_branch_add(args),
        BranchAction::Track(args) => cmd_branch_track(args),
        BranchAction::Config(args) => cmd_branch_config(args),
        BranchAction::Reset(args) => cmd_branch_reset(args),
        BranchAction::Commit(args) => cmd_branch_commit(args),
        BranchAction::Abort(args) => cmd_branch_abort(args),
        BranchAction::Show(args) => cmd_branch_show(args),
        BranchAction::List => cmd_branch_list(),
    }
}

fn controller(session: &Session) -> LifecycleController<'_> {
    LifecycleController::new(&session.store, &session.config)
}

fn cmd_branch_add(args: BranchNameArgs) -> Result<()> {
    let session = Session::open()?;
    let branch = controller(&session).create(&args.name)?;

    session.record(Event::new(EventAction::BranchAdd).with_subject(&branch.name));

    println!("Created branch {:?}", branch.name);
    Ok(())
}

fn cmd_branch_track(args: BranchTrackArgs) -> Result<()> {
    let session = Session::open()?;
    let lifecycle = controller(&session);

    // Each target commits on its own, so the ones that went through are
    // recorded even when a later one fails.
    let mut applied: Vec<&str> = Vec::new();
    let mut branch: Option<Branch> = None;
    let mut failure = None;
    for target in &args.targets {
        match track_target(&lifecycle, &args.branch, target) {
            Ok(updated) => {
                applied.push(target);
                branch = Some(updated);
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if !applied.is_empty() {
        session.record(
            Event::new(EventAction::BranchTrack)
                .with_subject(&args.branch)
                .with_details(json!({ "targets": applied })),
        );
    }

    if let Some(branch) = &branch {
        print_progress(branch);
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// A unit (`mysql/0`) or a whole application (`mysql`).
fn track_target(lifecycle: &LifecycleController<'_>, branch: &str, target: &str) -> Result<Branch> {
    if target.contains('/') {
        let app = application_of(target)
            .ok_or_else(|| FleetError::InvalidArgument(format!("unit name {:?}", target)))?;
        lifecycle.assign_unit(branch, app, target)
    } else {
        lifecycle.assign_all_units(branch, target)
    }
}

fn cmd_branch_config(args: BranchConfigArgs) -> Result<()> {
    let settings = parse_settings(&args.settings)?;
    let session = Session::open()?;

    controller(&session).set_configs(&args.branch, &args.app, &settings)?;

    let keys: Vec<&str> = settings.iter().map(|(key, _)| key.as_str()).collect();
    session.record(
        Event::new(EventAction::BranchConfig)
            .with_subject(&args.branch)
            .with_details(json!({ "application": args.app, "set": keys })),
    );

    println!(
        "Staged {} setting(s) for {} on branch {:?}",
        settings.len(),
        args.app,
        args.branch
    );
    Ok(())
}

fn cmd_branch_reset(args: BranchResetArgs) -> Result<()> {
    let session = Session::open()?;
    controller(&session).reset_configs(&args.branch, &args.app, &args.keys)?;

    session.record(
        Event::new(EventAction::BranchConfig)
            .with_subject(&args.branch)
            .with_details(json!({ "application": args.app, "reset": args.keys })),
    );

    println!("Reset {} key(s) for {} on branch {:?}", args.keys.len(), args.app, args.branch);
    Ok(())
}

fn cmd_branch_commit(args: BranchNameArgs) -> Result<()> {
    let session = Session::open()?;
    let committed = controller(&session).commit(&args.name)?;

    let applications: Vec<&String> = committed.applications.keys().collect();
    session.record(
        Event::new(EventAction::BranchCommit)
            .with_subject(&committed.name)
            .with_details(json!({ "applications": applications })),
    );

    println!("Branch {:?} committed", committed.name);
    Ok(())
}

fn cmd_branch_abort(args: BranchNameArgs) -> Result<()> {
    let session = Session::open()?;
    controller(&session).abort(&args.name)?;

    session.record(Event::new(EventAction::BranchAbort).with_subject(&args.name));

    println!("Branch {:?} aborted", args.name);
    Ok(())
}

fn cmd_branch_show(args: BranchShowArgs) -> Result<()> {
    let session = Session::open()?;
    let summaries = controller(&session).summaries(args.name.as_deref(), args.units)?;

    if summaries.is_empty() {
        println!("No active branches.");
        return Ok(());
    }

    let yaml = serde_yaml::to_string(&summaries)
        .map_err(|e| FleetError::Internal(format!("failed to render branches: {}", e)))?;
    print!("{}", yaml);
    Ok(())
}

fn cmd_branch_list() -> Result<()> {
    let session = Session::open()?;
    let summaries = controller(&session).summaries(None, false)?;

    if summaries.is_empty() {
        println!("No active branches.");
        return Ok(());
    }

    for (name, summary) in &summaries {
        println!("{}  (created {} by {})", name, summary.created, summary.created_by);
    }
    Ok(())
}

fn print_progress(branch: &Branch) {
    for (app, state) in &branch.applications {
        println!("{}: {}", app, tracking::progress(state));
    }
}
