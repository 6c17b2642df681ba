//! hub-driver library crate.
//!
//! Driver side of the hub integration protocol: the hub connects over a
//! WebSocket, and this crate walks the user through adding, reconfiguring,
//! deleting and resetting devices.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Hub (JSON over WebSocket)
//!         ↕
//! [hub-driver]
//!   ├── domain/           DriverConfig
//!   ├── application/      Session registry, setup flow, request router,
//!   │                     unavailable broadcaster, bundled host driver
//!   └── infrastructure/
//!         ├── ws_server/   WebSocket accept loop (tokio-tungstenite)
//!         ├── connections/ Per-socket outbound channels
//!         └── storage/     TOML / in-memory configuration stores
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `hub-core`, and the traits in
//!   [`application::ports`]; it never names a socket or a file.
//! - `infrastructure` implements those traits with tokio, tungstenite and
//!   the file system.

/// Domain layer: process configuration.
pub mod domain;

/// Application layer: the setup conversation.
pub mod application;

/// Infrastructure layer: WebSocket server, connection table, storage.
pub mod infrastructure;
