//! CLI argument parsing for fleetctl.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// fleetctl: control-plane bookkeeping for a fleet of applications.
///
/// Model state lives in `.fleet/` in the current directory or the nearest
/// ancestor that has one:
/// - applications and their baseline configuration
/// - units and their lifecycle
/// - branches staging configuration for a subset of units
/// - safety blocks refusing classes of operations
#[derive(Parser, Debug)]
#[command(name = "fleetctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for fleetctl.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a model in the current directory.
    ///
    /// Creates `.fleet/` with its state, locks, and events directories and a
    /// default `config.yaml`. Safe to run again.
    Init,

    /// Register and list applications.
    App(AppCommand),

    /// Register and list units.
    Unit(UnitCommand),

    /// Stage configuration on a subset of units before rolling it out.
    Branch(BranchCommand),

    /// Show or change an application's configuration.
    ///
    /// With no settings, prints the configuration. With `--branch`, reads
    /// or stages changes on that branch instead of the baseline.
    Config(ConfigArgs),

    /// Mark units for removal.
    ///
    /// Each unit is handled independently; a missing unit is reported and
    /// the rest are still removed. An active `remove` block refuses the
    /// whole batch.
    RemoveUnit(RemoveUnitArgs),

    /// Safety block management.
    ///
    /// Enable, disable, or list blocks that refuse classes of operations.
    Block(BlockCommand),

    /// Lock management commands.
    ///
    /// List or clear model lock files.
    Lock(LockCommand),
}

/// Application subcommands.
#[derive(Parser, Debug)]
pub struct AppCommand {
    #[command(subcommand)]
    pub action: AppAction,
}

#[derive(Subcommand, Debug)]
pub enum AppAction {
    /// Register an application.
    Add(AppAddArgs),

    /// List applications.
    List,
}

/// Arguments for the `app add` command.
#[derive(Parser, Debug)]
pub struct AppAddArgs {
    /// Application name (e.g., mysql).
    pub name: String,

    /// Declare a configuration option as KEY=TYPE (string, int, float,
    /// boolean, list, map). Repeatable. With no options, any key is accepted.
    #[arg(long = "option", value_name = "KEY=TYPE")]
    pub options: Vec<String>,
}

/// Unit subcommands.
#[derive(Parser, Debug)]
pub struct UnitCommand {
    #[command(subcommand)]
    pub action: UnitAction,
}

#[derive(Subcommand, Debug)]
pub enum UnitAction {
    /// Register a unit of an existing application.
    Add(UnitAddArgs),

    /// List units and their life.
    List,
}

/// Arguments for the `unit add` command.
#[derive(Parser, Debug)]
pub struct UnitAddArgs {
    /// Unit name (e.g., mysql/0).
    pub unit: String,

    /// Attached storage ID. Repeatable; order is preserved.
    #[arg(long = "storage", value_name = "ID")]
    pub storage: Vec<String>,
}

/// Branch subcommands.
#[derive(Parser, Debug)]
pub struct BranchCommand {
    #[command(subcommand)]
    pub action: BranchAction,
}

#[derive(Subcommand, Debug)]
pub enum BranchAction {
    /// Create a branch.
    Add(BranchNameArgs),

    /// Set units to track a branch.
    ///
    /// Each target is a unit (mysql/0) or an application (mysql), which
    /// tracks all of its live units.
    Track(BranchTrackArgs),

    /// Stage configuration changes on a branch.
    Config(BranchConfigArgs),

    /// Drop staged configuration keys from a branch.
    Reset(BranchResetArgs),

    /// Merge a branch into the baseline and delete it.
    Commit(BranchNameArgs),

    /// Delete a branch without changing the baseline.
    Abort(BranchNameArgs),

    /// Show branch summaries as YAML.
    Show(BranchShowArgs),

    /// List branches.
    List,
}

/// A single branch name argument.
#[derive(Parser, Debug)]
pub struct BranchNameArgs {
    /// Branch name.
    pub name: String,
}

/// Arguments for the `branch track` command.
#[derive(Parser, Debug)]
pub struct BranchTrackArgs {
    /// Branch name.
    pub branch: String,

    /// Units or applications.
    #[arg(required = true)]
    pub targets: Vec<String>,
}

/// Arguments for the `branch config` command.
#[derive(Parser, Debug)]
pub struct BranchConfigArgs {
    /// Branch name.
    pub branch: String,

    /// Application name.
    pub app: String,

    /// Settings as KEY=VALUE. Values are YAML (`8`, `true`, `[a, b]`).
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub settings: Vec<String>,
}

/// Arguments for the `branch reset` command.
#[derive(Parser, Debug)]
pub struct BranchResetArgs {
    /// Branch name.
    pub branch: String,

    /// Application name.
    pub app: String,

    /// Keys to drop.
    #[arg(required = true)]
    pub keys: Vec<String>,
}

/// Arguments for the `branch show` command.
#[derive(Parser, Debug)]
pub struct BranchShowArgs {
    /// Branch to show. Shows all branches if omitted.
    pub name: Option<String>,

    /// List tracking and pending units per application.
    #[arg(long)]
    pub units: bool,
}

/// Arguments for the `config` command.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Application name.
    pub app: String,

    /// Settings as KEY=VALUE. Prints the configuration if none are given.
    #[arg(value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Target a branch instead of the baseline.
    #[arg(long)]
    pub branch: Option<String>,
}

/// Arguments for the `remove-unit` command.
#[derive(Parser, Debug)]
pub struct RemoveUnitArgs {
    /// Units to remove, processed in order.
    #[arg(required = true)]
    pub units: Vec<String>,
}

/// Block subcommands.
#[derive(Parser, Debug)]
pub struct BlockCommand {
    #[command(subcommand)]
    pub action: BlockAction,
}

#[derive(Subcommand, Debug)]
pub enum BlockAction {
    /// Refuse a class of operations (destroy, remove, change, all).
    Enable(BlockEnableArgs),

    /// Lift a block.
    Disable(BlockKindArgs),

    /// List active blocks.
    List,
}

/// Arguments for the `block enable` command.
#[derive(Parser, Debug)]
pub struct BlockEnableArgs {
    /// Block kind.
    pub kind: String,

    /// Message shown to whoever is refused.
    #[arg(short, long)]
    pub message: Option<String>,
}

/// Arguments for the `block disable` command.
#[derive(Parser, Debug)]
pub struct BlockKindArgs {
    /// Block kind.
    pub kind: String,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all lock files.
    ///
    /// Shows each lock with its age and owner.
    List,

    /// Clear a specific lock.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock name (e.g., txn).
    pub name: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
