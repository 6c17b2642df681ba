//! Domain entities for the hub integration driver.
//!
//! This module contains pure data types with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application.  Domain code has **no** imports
//! from network libraries, file systems, or async runtimes, so it compiles
//! and tests anywhere.  The setup flow in `hub-driver` depends on these
//! types; they never depend on it.

/// Configured devices and the collection the configuration store persists.
pub mod configuration;

/// Protocol-level entity kinds derived from a configured device.
pub mod entity;

/// Descriptive user-input forms shown during setup.
pub mod settings;

/// Setup steps, reconfiguration actions and handler results.
pub mod setup;
