//! Collaborator interfaces the setup flow depends on.
//!
//! The flow never talks to a socket, a file, or a concrete driver directly.
//! Everything outside the core is reached through one of these traits and
//! injected at construction time, so the flow runs unchanged against the
//! WebSocket host in production and against recording doubles in tests.

use std::path::PathBuf;

use async_trait::async_trait;
use hub_core::protocol::messages::SetDriverUserDataMsg;
use hub_core::{
    Configuration, ConfigurationItem, EntityRef, OutboundMessage, ProtocolError, SettingsPage,
    SetupResult,
};
use thiserror::Error;

// ── Sending ───────────────────────────────────────────────────────────────────

/// Failure to deliver an outbound message.
#[derive(Debug, Error)]
pub enum SendError {
    /// No connection is registered under this socket id.
    #[error("socket {0} is not connected")]
    UnknownSocket(String),

    /// The connection's writer has stopped (peer disconnected).
    #[error("socket {0} is closed")]
    Closed(String),

    /// The socket's writer did not take the frame in time.
    #[error("socket {0} is not draining its outbound queue")]
    Stalled(String),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] ProtocolError),
}

/// Sends a typed message on a socket.
///
/// Sends issued one after another by the same caller must reach the socket
/// in that order.  Sends issued concurrently have no ordering among
/// themselves.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(&self, socket_id: &str, message: OutboundMessage) -> Result<(), SendError>;
}

// ── Configuration store ───────────────────────────────────────────────────────

/// Failure of a configuration store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error accessing configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Shared, asynchronous store of configured devices.
///
/// There is no versioning: `update` replaces the whole collection, so two
/// sockets doing read-modify-write at the same time can overwrite each
/// other.  Callers re-read with `get` right before every mutation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn get(&self) -> Result<Configuration, StoreError>;

    async fn update(&self, configuration: Configuration) -> Result<(), StoreError>;
}

// ── Driver-supplied behaviour ─────────────────────────────────────────────────

/// Per-driver setup behaviour.
///
/// Handlers that return [`SetupResult::Handled`] are responsible for sending
/// whatever follow-up prompt they want the user to answer.
#[async_trait]
pub trait SetupHandlers: Send + Sync {
    /// Form shown when the user adds a device.
    fn new_entity_page(&self) -> SettingsPage;

    /// Form shown when the user chose `configure` for `item`.
    fn reconfigure_page(&self, item: &ConfigurationItem) -> SettingsPage;

    async fn on_confirm(
        &self,
        socket_id: &str,
        msg: &SetDriverUserDataMsg,
    ) -> anyhow::Result<SetupResult>;

    async fn on_new_entity_data(
        &self,
        socket_id: &str,
        msg: &SetDriverUserDataMsg,
    ) -> anyhow::Result<SetupResult>;

    async fn on_reconfigured_data(
        &self,
        socket_id: &str,
        msg: &SetDriverUserDataMsg,
        item: &ConfigurationItem,
    ) -> anyhow::Result<SetupResult>;
}

/// Maps a configured device's base id to the entities it backs.
pub trait EntityResolver: Send + Sync {
    fn resolve_entities(&self, entity_base_id: &str) -> Vec<EntityRef>;
}
