//! `fleetctl block` subcommands.

use super::Session;
use crate::cli::{BlockAction, BlockCommand, BlockEnableArgs, BlockKindArgs};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::model::BlockKind;
use crate::safety::BlockAdmin;
use crate::store::TxnRunner;
use serde_json::json;

pub fn dispatch(cmd: BlockCommand) -> Result<()> {
    match cmd.action {
        BlockAction::Enable(args) => cmd_block_enable(args),
        BlockAction::Disable(args) => cmd_block_disable(args),
        BlockAction::List => cmd_block_list(),
    }
}

fn admin(session: &Session) -> BlockAdmin<'_> {
    BlockAdmin::new(&session.store, TxnRunner::from_config(&session.config))
}

fn cmd_block_enable(args: BlockEnableArgs) -> Result<()> {
    let kind: BlockKind = args.kind.parse()?;
    let message = args
        .message
        .unwrap_or_else(|| format!("{} operations are blocked", kind));

    let session = Session::open()?;
    admin(&session).enable(kind, &message)?;

    session.record(
        Event::new(EventAction::BlockEnable)
            .with_subject(kind.as_str())
            .with_details(json!({ "message": message })),
    );

    println!("Enabled {} block: {}", kind, message);
    Ok(())
}

fn cmd_block_disable(args: BlockKindArgs) -> Result<()> {
    let kind: BlockKind = args.kind.parse()?;

    let session = Session::open()?;
    admin(&session).disable(kind)?;

    session.record(Event::new(EventAction::BlockDisable).with_subject(kind.as_str()));

    println!("Disabled {} block", kind);
    Ok(())
}

fn cmd_block_list() -> Result<()> {
    let session = Session::open()?;
    let blocks = admin(&session).list_active()?;

    if blocks.is_empty() {
        println!("No active blocks.");
        return Ok(());
    }

    for block in &blocks {
        println!("{:<8} {}", block.kind.as_str(), block.message);
    }
    Ok(())
}
