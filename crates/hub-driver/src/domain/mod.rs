//! Domain layer for hub-driver: runtime configuration.
//!
//! The protocol and setup types live in `hub-core`; the only thing this
//! crate adds at the domain level is how the process itself is configured.

pub mod config;

pub use config::{DriverConfig, StorageMode};
