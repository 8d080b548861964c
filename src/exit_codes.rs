//! Exit code constants for the fleetctl CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state, partial batch failure)
//! - 2: Referenced entity not found
//! - 3: Operation refused by an active safety block
//! - 4: Contention (retries exhausted or lock held)
//! - 5: Internal storage failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or some batch items failed.
pub const USER_ERROR: i32 = 1;

/// A branch, unit, or application named on the command line does not exist.
pub const NOT_FOUND: i32 = 2;

/// A safety block refused the operation.
pub const BLOCKED: i32 = 3;

/// Concurrent modification: transaction retries exhausted or lock held.
pub const CONFLICT: i32 = 4;

/// Storage I/O or serialization failure.
pub const INTERNAL: i32 = 5;
