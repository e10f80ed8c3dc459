//! Default values and tuning constants for geolocr.

use std::time::Duration;

/// Seconds between resolution cycles in the main polling loop.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Minimum accepted polling interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum accepted polling interval (one hour).
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Seconds the GPS source waits for a fix before giving up on a cycle.
pub const DEFAULT_GPS_TIMEOUT_SECS: f64 = 2.0;

/// Upper bound for the configurable GPS timeout.
pub const MAX_GPS_TIMEOUT_SECS: f64 = 60.0;

/// Sleep between empty polls of the GPS report feed.
pub const GPS_POLL_SLEEP: Duration = Duration::from_millis(100);

/// Timeout applied to every provider HTTP request. Geolocation providers
/// answer quickly or not at all, so this stays short to bound a full
/// resolution cycle.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(1);

/// Default gpsd endpoint.
pub const GPSD_HOST: &str = "127.0.0.1";
pub const GPSD_PORT: u16 = 2947;

/// Exit codes
pub const EXIT_FAILURE: i32 = 1;
