//! Hub integration driver — entry point.
//!
//! Listens for the hub's WebSocket connection and runs the setup
//! conversation (add / configure / delete / reset devices) for the bundled
//! host-device driver.
//!
//! # Usage
//!
//! ```text
//! hub-driver [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>       WebSocket bind address [default: 0.0.0.0]
//!   --port <PORT>       WebSocket port [default: 9090]
//!   --config <PATH>     Device configuration file [default: platform config dir]
//!   --in-memory         Keep devices in memory only
//!   --driver-id <ID>    Name reported to the hub [default: hub-driver]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable            | Default     | Description                 |
//! |---------------------|-------------|-----------------------------|
//! | `HUB_DRIVER_BIND`   | `0.0.0.0`   | WebSocket bind address      |
//! | `HUB_DRIVER_PORT`   | `9090`      | WebSocket port              |
//! | `HUB_DRIVER_CONFIG` | platform    | Device configuration file   |
//! | `HUB_DRIVER_ID`     | `hub-driver`| Name reported to the hub    |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hub_driver::application::ports::ConfigurationStore;
use hub_driver::domain::{DriverConfig, StorageMode};
use hub_driver::infrastructure::run_server;
use hub_driver::infrastructure::storage::{
    default_config_path, MemoryConfigurationStore, TomlConfigurationStore,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Hub integration driver.
#[derive(Debug, Parser)]
#[command(
    name = "hub-driver",
    about = "Driver-side setup handshake host for the hub integration protocol",
    version
)]
struct Cli {
    /// IP address to bind the WebSocket server to.
    #[arg(long, default_value = "0.0.0.0", env = "HUB_DRIVER_BIND")]
    bind: String,

    /// TCP port for the WebSocket server.
    #[arg(long, default_value_t = 9090, env = "HUB_DRIVER_PORT")]
    port: u16,

    /// Device configuration file.  Defaults to `devices.toml` in the
    /// platform config directory.
    #[arg(long, env = "HUB_DRIVER_CONFIG", conflicts_with = "in_memory")]
    config: Option<PathBuf>,

    /// Keep configured devices in memory only; nothing is written to disk.
    #[arg(long)]
    in_memory: bool,

    /// Driver name reported in `driver_version` responses.
    #[arg(long, default_value = "hub-driver", env = "HUB_DRIVER_ID")]
    driver_id: String,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`DriverConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address, or if no
    /// configuration path was given and the platform config directory cannot
    /// be determined.
    fn into_driver_config(self) -> anyhow::Result<DriverConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid WebSocket bind address: '{}:{}'", self.bind, self.port))?;

        let storage = if self.in_memory {
            StorageMode::InMemory
        } else {
            let path = match self.config {
                Some(path) => path,
                None => default_config_path().context(
                    "could not determine platform config directory; pass --config or --in-memory",
                )?,
            };
            StorageMode::File(path)
        };

        Ok(DriverConfig {
            ws_bind_addr,
            storage,
            driver_id: self.driver_id,
            ..DriverConfig::default()
        })
    }
}

fn open_store(storage: &StorageMode) -> Arc<dyn ConfigurationStore> {
    match storage {
        StorageMode::File(path) => Arc::new(TomlConfigurationStore::new(path)),
        StorageMode::InMemory => Arc::new(MemoryConfigurationStore::default()),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_driver_config()?;

    info!(
        "hub driver {} v{} starting — ws={}, storage={:?}",
        config.driver_id, config.driver_version, config.ws_bind_addr, config.storage
    );

    let store = open_store(&config.storage);

    // Cleared by Ctrl+C; the accept loop polls it every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, store, running).await?;

    info!("hub driver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn cli(bind: &str, in_memory: bool, config: Option<&str>) -> Cli {
        Cli {
            bind: bind.to_string(),
            port: 9090,
            config: config.map(PathBuf::from),
            in_memory,
            driver_id: "hub-driver".to_string(),
        }
    }

    /// Declared default of one argument, read from the command definition so
    /// `HUB_DRIVER_*` variables in the calling shell do not leak in.
    fn declared_default(id: &str) -> Option<String> {
        Cli::command()
            .get_arguments()
            .find(|arg| arg.get_id().as_str() == id)
            .and_then(|arg| arg.get_default_values().first())
            .map(|value| value.to_string_lossy().into_owned())
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        assert_eq!(declared_default("bind").as_deref(), Some("0.0.0.0"));
        assert_eq!(declared_default("port").as_deref(), Some("9090"));
        assert_eq!(declared_default("driver_id").as_deref(), Some("hub-driver"));
        assert_eq!(declared_default("config"), None);
    }

    #[test]
    fn test_cli_port_reads_environment_fallback() {
        let command = Cli::command();
        let port = command
            .get_arguments()
            .find(|arg| arg.get_id().as_str() == "port")
            .unwrap();
        assert_eq!(port.get_env().and_then(|v| v.to_str()), Some("HUB_DRIVER_PORT"));
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["hub-driver", "--port", "9999"]);
        assert_eq!(cli.port, 9999);
    }

    #[test]
    fn test_cli_rejects_config_with_in_memory() {
        let result = Cli::try_parse_from(["hub-driver", "--in-memory", "--config", "x.toml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_driver_config_with_explicit_file() {
        // Arrange
        let cli = cli("127.0.0.1", false, Some("/tmp/devices.toml"));

        // Act
        let config = cli.into_driver_config().unwrap();

        // Assert
        assert_eq!(config.ws_bind_addr.to_string(), "127.0.0.1:9090");
        assert_eq!(
            config.storage,
            StorageMode::File(PathBuf::from("/tmp/devices.toml"))
        );
    }

    #[test]
    fn test_into_driver_config_in_memory() {
        let config = cli("0.0.0.0", true, None).into_driver_config().unwrap();
        assert_eq!(config.storage, StorageMode::InMemory);
    }

    #[test]
    fn test_into_driver_config_invalid_bind_returns_error() {
        // Arrange: not an IP address
        let cli = cli("not.an.ip", true, None);

        // Act
        let result = cli.into_driver_config();

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }
}
