//! Multi-source location resolution.
//!
//! This module contains the core of geolocr: a set of location sources tried
//! in fixed priority order until one produces a fix.
//!
//! ## Module Structure
//!
//! - [`reading`]: the normalized [`Reading`] shape every source produces,
//!   plus [`ResolvedLocation`] and [`SourceKind`]
//! - [`resolver`]: the [`Resolver`] orchestrator and the [`LocationSource`]
//!   trait it iterates
//! - [`gps`]: state machine over the GPS daemon's report stream
//! - [`platform`]: cached last-known fix from the host OS location service
//! - [`wifi`]: associated access-point reverse geolocation with BSSID dedup
//! - [`ip`]: external-IP geolocation with a per-provider rate-limit gate
//! - [`providers`]: the Wi-Fi and IP provider tables and response mapping
//! - [`scanner`]: platform access-point fingerprint extraction
//!
//! ## Priority Order
//!
//! GPS → platform location services → Wi-Fi lookup → IP lookup. The first
//! source returning a reading wins and no lower-priority source is consulted
//! in that cycle. A cycle where every source comes up empty is the routine
//! "no signal" outcome, not an error.

pub mod gps;
pub mod ip;
pub mod platform;
pub mod providers;
pub mod reading;
pub mod resolver;
pub mod scanner;
pub mod wifi;

// Re-exports for public API
pub use reading::{Reading, ResolvedLocation, SourceKind};
pub use resolver::{LocationSource, Resolver};

#[cfg(test)]
mod tests;
