//! Error types for fleetctl.
//!
//! Uses thiserror for derive macros. Every variant maps to one exit code so the
//! command layer can report failures without inspecting message text.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for fleetctl operations.
#[derive(Error, Debug)]
pub enum FleetError {
    /// A caller-supplied name or value is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity being created is already present (or a limit on such
    /// entities has been reached).
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The referenced entity does not exist. The payload names the entity,
    /// e.g. `branch "canary"`.
    #[error("{0} not found")]
    NotFound(String),

    /// Optimistic-concurrency retries were exhausted. Safe to retry the
    /// whole operation.
    #[error("state changing too quickly; try again soon ({0})")]
    Conflict(String),

    /// An active safety block refused the operation. The payload is the
    /// operator's block message.
    #[error("the operation has been blocked: {0}")]
    Blocked(String),

    /// Merging a branch into the baseline failed for one application; no
    /// baseline was changed and the branch is intact.
    #[error("cannot commit branch {branch:?}: application {application:?}: {reason}")]
    CommitFailed {
        branch: String,
        application: String,
        reason: String,
    },

    /// Storage I/O or serialization failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invalid invocation or model directory state at the command layer.
    #[error("{0}")]
    UserError(String),

    /// Some items of a batch failed; the per-item outcomes were already
    /// reported.
    #[error("{0}")]
    PartialFailure(String),

    /// A lock file could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

impl FleetError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FleetError::InvalidArgument(_) => exit_codes::USER_ERROR,
            FleetError::AlreadyExists(_) => exit_codes::USER_ERROR,
            FleetError::UserError(_) => exit_codes::USER_ERROR,
            FleetError::PartialFailure(_) => exit_codes::USER_ERROR,
            FleetError::CommitFailed { .. } => exit_codes::USER_ERROR,
            FleetError::NotFound(_) => exit_codes::NOT_FOUND,
            FleetError::Blocked(_) => exit_codes::BLOCKED,
            FleetError::Conflict(_) => exit_codes::CONFLICT,
            FleetError::LockError(_) => exit_codes::CONFLICT,
            FleetError::Internal(_) => exit_codes::INTERNAL,
        }
    }

    /// True for errors where retrying the identical call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FleetError::Conflict(_) | FleetError::LockError(_))
    }

    /// Shorthand for a `NotFound` naming a kind and an entity name.
    pub(crate) fn not_found(kind: &str, name: &str) -> Self {
        FleetError::NotFound(format!("{} {:?}", kind, name))
    }
}

impl From<serde_json::Error> for FleetError {
    fn from(e: serde_json::Error) -> Self {
        FleetError::Internal(format!("JSON error: {}", e))
    }
}

/// Result type alias for fleetctl operations.
pub type Result<T> = std::result::Result<T, FleetError>;
