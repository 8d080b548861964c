//! Configuration model for fleetctl.
//!
//! This module defines the Config struct that represents `.fleet/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;


pub use model::Config;
