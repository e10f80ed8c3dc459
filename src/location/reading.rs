//! Normalized location readings and resolved fixes.
//!
//! Every source funnels its raw provider data through [`Reading::checked`],
//! which enforces the coordinate ranges at the one place they can be violated.
//! A source therefore hands the resolver either a well-formed reading or
//! nothing at all, never a partially populated one.

use chrono::{DateTime, Local};

/// A normalized position report produced by any location source.
///
/// Latitude and longitude are always present and within range. The optional
/// fields stay `None` when the underlying provider did not report them;
/// they are never defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Degrees, -90.0 to 90.0
    pub latitude: f64,
    /// Degrees, -180.0 to 180.0
    pub longitude: f64,
    /// Estimated horizontal error in meters
    pub accuracy: Option<f64>,
    /// Meters above mean sea level
    pub altitude: Option<f64>,
    /// Course over ground in degrees from true north
    pub heading: Option<f64>,
    /// Speed over ground in meters per second
    pub speed: Option<f64>,
}

impl Reading {
    /// Create a reading after validating the coordinate ranges.
    ///
    /// Returns `None` when either coordinate is out of range or not finite,
    /// so malformed provider data can never reach the resolver.
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            heading: None,
            speed: None,
        })
    }

    /// Set the accuracy estimate, builder style.
    pub fn with_accuracy(mut self, accuracy: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the altitude, builder style.
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }

    /// Set the heading, builder style.
    pub fn with_heading(mut self, heading: Option<f64>) -> Self {
        self.heading = heading;
        self
    }

    /// Set the speed, builder style.
    pub fn with_speed(mut self, speed: Option<f64>) -> Self {
        self.speed = speed;
        self
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)?;
        if let Some(accuracy) = self.accuracy {
            write!(f, " (±{accuracy:.0}m)")?;
        }
        Ok(())
    }
}

/// The location source that produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A fix from the GPS daemon
    Gps,
    /// The host OS location service's cached fix
    PlatformLocation,
    /// Reverse lookup of the associated Wi-Fi access point
    WiFi,
    /// Geolocation of the external IP address
    Ip,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Gps => "GPS",
            SourceKind::PlatformLocation => "PlatformLocation",
            SourceKind::WiFi => "WiFi",
            SourceKind::Ip => "IP",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A successful resolution: the reading, the source that won, and when.
///
/// Created only when a resolution cycle succeeds and wholly replaced by each
/// subsequent success; it is never partially updated.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub reading: Reading,
    pub source: SourceKind,
    pub timestamp: DateTime<Local>,
}
