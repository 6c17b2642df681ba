//! # hub-core
//!
//! Shared library for the hub integration driver containing the JSON
//! protocol envelopes, the frame codec, and the domain entities the setup
//! flow operates on.
//!
//! This crate has zero dependencies on sockets, async runtimes, or the file
//! system.
//!
//! # Architecture overview (for beginners)
//!
//! A remote-control *hub* connects to a third-party *driver* over a
//! persistent WebSocket.  Before the hub can control any device, the user
//! walks through a multi-step "setup" conversation: the driver shows a form,
//! the user fills it in, the driver stores the resulting device
//! configuration.
//!
//! This crate (`hub-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – What travels over the socket.  Inbound JSON frames are
//!   decoded into typed requests; outbound responses and events are encoded
//!   back to JSON text.
//!
//! - **`domain`** – Pure data with no I/O: configured devices, the settings
//!   forms shown to the user, setup steps and the entity kinds a device
//!   exposes.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `hub_core::Configuration` instead of `hub_core::domain::configuration::Configuration`.
pub use domain::configuration::{Configuration, ConfigurationError, ConfigurationItem};
pub use domain::entity::{EntityRef, EntityType};
pub use domain::settings::{DropdownItem, Setting, SettingField, SettingsPage};
pub use domain::setup::{SetupAction, SetupResult, SetupStep};
pub use protocol::codec::{decode_inbound, encode_outbound, ProtocolError};
pub use protocol::messages::{Inbound, OutboundMessage};
