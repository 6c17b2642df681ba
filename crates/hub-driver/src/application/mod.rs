//! Application layer: the setup conversation and the request routing around it.
//!
//! - [`session_registry`] – per-socket setup state.
//! - [`setup_flow`] – entry point, user-data dispatcher, reconfiguration
//!   actions and finalization.
//! - [`broadcast`] – entity-unavailable fan-out after delete / reset.
//! - [`router`] – maps decoded requests onto the flow.
//! - [`host_driver`] – the bundled driver for devices addressed by host name.
//! - [`ports`] – traits for everything the layer reaches outside itself.

pub mod broadcast;
pub mod error;
pub mod host_driver;
pub mod ports;
pub mod router;
pub mod session_registry;
pub mod setup_flow;

#[cfg(test)]
pub(crate) mod testing;
