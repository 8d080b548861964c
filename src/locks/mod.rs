//! Locking subsystem for fleetctl.
//!
//! The file-backed store serializes the *commit* step of every transaction
//! through a single model-wide lock (`txn.lock`). Reads never lock; the
//! optimistic assertions checked while the lock is held are what make
//! concurrent administrative sessions safe.
//!
//! # Lock Files
//!
//! Lock files live in `.fleet/locks/` and are created with **create_new**
//! semantics (exclusive create), so only one process can hold a given lock.
//! Each file holds JSON metadata: `owner` (`user@HOST`), `pid`,
//! `created_at` (RFC3339), and `action`.
//!
//! # RAII Guards
//!
//! Locks are released when their guard drops. If deletion fails during drop,
//! a warning is printed but the program does not crash. A lock left behind by
//! a crashed process goes stale and can be removed with
//! `fleetctl lock clear <name> --force`.

mod guard;
mod metadata;
mod operations;
mod types;


pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{acquire_lock, clear_lock, list_locks, try_acquire_lock};
pub use types::LockInfo;
