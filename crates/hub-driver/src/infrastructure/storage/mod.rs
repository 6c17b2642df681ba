//! Storage infrastructure: device configuration persistence.
//!
//! - [`config_store::TomlConfigurationStore`] keeps the configured devices in
//!   a TOML file, by default under the platform config directory.
//! - [`config_store::MemoryConfigurationStore`] keeps them in process memory,
//!   for `--in-memory` runs and tests.

pub mod config_store;

pub use config_store::{default_config_path, MemoryConfigurationStore, TomlConfigurationStore};
