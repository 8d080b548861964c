//! `fleetctl lock` subcommands.

use super::Session;
use crate::cli::{LockAction, LockClearArgs, LockCommand};
use crate::error::{FleetError, Result};
use crate::events::{Event, EventAction};
use crate::locks;
use serde_json::json;

pub fn dispatch(cmd: LockCommand) -> Result<()> {
    match cmd.action {
        LockAction::List => cmd_lock_list(),
        LockAction::Clear(args) => cmd_lock_clear(args),
    }
}

fn cmd_lock_list() -> Result<()> {
    let session = Session::open()?;
    let stale_minutes = session.config.lock_stale_minutes;

    let locks = locks::list_locks(&session.ctx, stale_minutes)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {}:", lock.name);
        println!("    Owner:      {}", lock.metadata.owner);
        if let Some(pid) = lock.metadata.pid {
            println!("    PID:        {}", pid);
        }
        println!("    Created:    {}", lock.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("    Age:        {}", lock.metadata.age_string());
        println!("    Action:     {}", lock.metadata.action);
        if lock.is_stale {
            println!("    Status:     STALE (exceeds {} min threshold)", stale_minutes);
        }
        println!("    Path:       {}", lock.path.display());
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale. Use `fleetctl lock clear <name> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

fn cmd_lock_clear(args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(FleetError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock while its holder is still running can interleave two commits.\n\
             Only clear locks if you are certain the lock holder has crashed.\n\n\
             To clear the lock, run:\n  fleetctl lock clear {} --force",
            args.name
        )));
    }

    let session = Session::open()?;
    let cleared = locks::clear_lock(&session.ctx, &args.name, session.config.lock_stale_minutes)?;

    session.record(
        Event::new(EventAction::LockClear)
            .with_subject(&cleared.name)
            .with_details(json!({
                "age_minutes": cleared.metadata.age().num_minutes(),
                "was_stale": cleared.is_stale,
                "owner": cleared.metadata.owner,
                "original_action": cleared.metadata.action,
            })),
    );

    println!("Cleared lock: {}", cleared.name);
    println!();
    println!("Lock details:");
    println!("  Owner:      {}", cleared.metadata.owner);
    if let Some(pid) = cleared.metadata.pid {
        println!("  PID:        {}", pid);
    }
    println!("  Created:    {}", cleared.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Age:        {}", cleared.metadata.age_string());
    println!("  Action:     {}", cleared.metadata.action);
    if cleared.is_stale {
        println!("  Status:     was STALE");
    }
    println!("  Path:       {}", cleared.path.display());

    Ok(())
}
