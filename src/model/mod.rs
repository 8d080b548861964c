//! Documents held in a model's store.
//!
//! Each type here is one persisted document kind. Documents are plain data;
//! the rules for changing them live in the lifecycle and removal layers,
//! which always go through the transactional store.

mod application;
mod block;
mod branch;
mod config_value;
mod model_doc;
pub mod names;
mod unit;

pub use application::Application;
pub use block::{BlockKind, SafetyBlock};
pub use branch::{AppBranchState, Branch};
pub use config_value::{ConfigValue, OptionType};
pub use model_doc::{MODEL_DOC_ID, ModelDoc};
pub use names::{BASELINE_BRANCH, validate_branch_name};
pub use unit::{Life, Unit};
