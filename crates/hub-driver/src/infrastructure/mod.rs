//! Infrastructure layer for hub-driver.
//!
//! Everything that touches the network or the file system:
//!
//! - [`ws_server`] – WebSocket accept loop and per-connection tasks.
//! - [`connections`] – socket-id → writer channel table; the production
//!   [`ResponseSender`](crate::application::ports::ResponseSender).
//! - [`storage`] – configuration store implementations.

pub mod connections;
pub mod storage;
pub mod ws_server;

pub use ws_server::{run_server, DriverServer};
