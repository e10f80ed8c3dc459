//! # Geolocr Library
//!
//! Internal library for the geolocr binary application
//!
//! This library exists to enable testing of the resolution internals and
//! provide clean separation between CLI dispatch (main.rs) and application
//! logic.
//!
//! ## Architecture
//!
//! - **Core Logic**: `location` module with the resolver and the per-source
//!   acquisition state machines (GPS, platform services, Wi-Fi, IP)
//! - **Collaborators**: `gpsd` for the daemon transport, `net` for the HTTP
//!   seam behind the lookup providers
//! - **Configuration**: `config` module for TOML-based settings
//! - **Infrastructure**: signal handling, logging, CLI parsing

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

// Public API modules
pub mod args;
pub mod config;
pub mod constants;
pub mod gpsd;
pub mod location;
pub mod net;
pub mod signals;

// Re-export for binary and integration tests
pub use location::{LocationSource, Reading, ResolvedLocation, Resolver, SourceKind};
