//! Filesystem utilities for fleetctl.
//!
//! The file-backed store and the config writer rely on atomic replacement so
//! model state is never observed half-written.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
