//! GPS source: state machine over the daemon's report stream.
//!
//! The source drains typed reports from a [`GpsdFeed`] until it either sees a
//! valid TPV fix, learns that no fix is achievable this cycle (no connected
//! device, no satellites in view), or runs out of idle time. The transport
//! behind the feed is opaque; see `crate::gpsd` for the shipped TCP adapter.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::constants::GPS_POLL_SLEEP;

use super::reading::{Reading, SourceKind};
use super::resolver::LocationSource;

/// A decoded report from the GPS daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum GpsReport {
    /// Full device inventory; replaces the connected-device counter.
    Devices { count: usize },
    /// A single device connected or disconnected.
    Device { connected: bool },
    /// A position fix attempt. Mode 0 is unknown, 1 is no-fix, 2/3 are
    /// 2D/3D fixes.
    Tpv {
        mode: u8,
        lat: Option<f64>,
        lon: Option<f64>,
        /// Estimated longitude error in meters
        epx: Option<f64>,
        /// Estimated latitude error in meters
        epy: Option<f64>,
        alt: Option<f64>,
        /// Course over ground, degrees from true north
        track: Option<f64>,
        speed: Option<f64>,
    },
    /// Satellite visibility. Zero tracked satellites means no fix is
    /// achievable this cycle.
    Sky { satellites: usize },
    Version,
    Watch,
    /// A report class this source does not interpret.
    Other(String),
}

/// Report feed collaborator: a non-blocking "has next" poll plus a blocking
/// "get next" call.
pub trait GpsdFeed {
    fn waiting(&mut self) -> bool;
    fn next_report(&mut self) -> Result<GpsReport>;
}

/// Location source backed by the GPS daemon.
pub struct GpsSource {
    /// `None` when the daemon connection was refused at startup; the source
    /// is then permanently unavailable for the process lifetime.
    feed: Option<Box<dyn GpsdFeed>>,
    timeout: Duration,
    running: Arc<AtomicBool>,
    device_count: usize,
}

impl GpsSource {
    pub fn new(
        feed: Option<Box<dyn GpsdFeed>>,
        timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            feed,
            timeout,
            running,
            device_count: 0,
        }
    }
}

impl LocationSource for GpsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Gps
    }

    fn acquire(&mut self) -> Option<Reading> {
        let feed = self.feed.as_mut()?;

        // Idle baseline: resets on every received report regardless of class,
        // so a chatty daemon that never fixes still times out on silence only.
        let mut idle_since = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if feed.waiting() {
                let report = match feed.next_report() {
                    Ok(report) => report,
                    Err(e) => {
                        log_pipe!();
                        log_warning!("GPS daemon read failed: {e:#}");
                        return None;
                    }
                };
                idle_since = Instant::now();

                match report {
                    GpsReport::Devices { count } => {
                        self.device_count = count;
                    }
                    GpsReport::Device { connected: true } => {
                        log_info!("GPS device connected");
                        self.device_count += 1;
                    }
                    GpsReport::Device { connected: false } => {
                        log_warning!("GPS device disconnected");
                        self.device_count = self.device_count.saturating_sub(1);
                    }
                    GpsReport::Tpv {
                        mode,
                        lat,
                        lon,
                        epx,
                        epy,
                        alt,
                        track,
                        speed,
                    } => {
                        if mode <= 1 {
                            log_debug!("GPS has no fix (mode {mode})");
                        } else if let (Some(lat), Some(lon)) = (lat, lon) {
                            // Accuracy only when both error estimates are present
                            let accuracy = match (epx, epy) {
                                (Some(epx), Some(epy)) => Some(epx.max(epy)),
                                _ => None,
                            };
                            match Reading::checked(lat, lon) {
                                Some(reading) => {
                                    return Some(
                                        reading
                                            .with_accuracy(accuracy)
                                            .with_altitude(alt)
                                            .with_heading(track)
                                            .with_speed(speed),
                                    );
                                }
                                None => {
                                    log_warning!(
                                        "GPS fix has out-of-range coordinates ({lat}, {lon})"
                                    );
                                }
                            }
                        } else {
                            log_warning!(
                                "No latitude or longitude in GPS fix, this should not happen"
                            );
                        }
                    }
                    GpsReport::Sky { satellites: 0 } => {
                        log_debug!("No satellites in view");
                        return None;
                    }
                    GpsReport::Sky { .. } | GpsReport::Version | GpsReport::Watch => {}
                    GpsReport::Other(class) => {
                        log_debug!("Unsupported GPS report class '{class}'");
                    }
                }
            } else {
                if self.device_count == 0 {
                    log_warning!("No GPS device connected");
                    return None;
                }
                if idle_since.elapsed() > self.timeout {
                    log_warning!(
                        "GPS did not return a fix within {:.1}s",
                        self.timeout.as_secs_f64()
                    );
                    return None;
                }
                std::thread::sleep(GPS_POLL_SLEEP);
            }
        }

        // Stop flag raised while waiting
        None
    }
}
