//! Driver process configuration.
//!
//! [`DriverConfig`] is a plain struct with no environment reads of its own.
//! `main.rs` fills it from CLI arguments and environment variables; tests
//! build it directly.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Where configured devices are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// TOML file at the given path.
    File(PathBuf),
    /// Process memory; lost on exit.
    InMemory,
}

/// All runtime configuration for the driver.
///
/// # Example
///
/// ```rust
/// use hub_driver::domain::DriverConfig;
///
/// let cfg = DriverConfig::default();
/// assert_eq!(cfg.ws_bind_addr.port(), 9090);
/// ```
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Address the hub connects to.  Port `0` asks the OS for a free port.
    pub ws_bind_addr: SocketAddr,

    pub storage: StorageMode,

    /// Name reported in `driver_version` responses.
    pub driver_id: String,

    pub driver_version: String,
}

impl Default for DriverConfig {
    /// | Field          | Default              |
    /// |----------------|----------------------|
    /// | ws_bind_addr   | `0.0.0.0:9090`       |
    /// | storage        | in memory            |
    /// | driver_id      | `hub-driver`         |
    /// | driver_version | crate version        |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            storage: StorageMode::InMemory,
            driver_id: "hub-driver".to_string(),
            driver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
