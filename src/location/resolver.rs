//! The resolver: fixed-priority iteration over location sources.

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;

use crate::config::Config;
use crate::constants::HTTP_TIMEOUT;
use crate::net::{HttpTransport, ReqwestTransport};
use crate::signals::SignalState;

use super::gps::GpsSource;
use super::ip::IpSource;
use super::platform::PlatformLocationSource;
use super::reading::{Reading, ResolvedLocation, SourceKind};
use super::scanner;
use super::wifi::WifiSource;

/// A single location source the resolver can consult.
///
/// `acquire` returns a well-formed reading or `None`, never an error: every
/// failure mode a source encounters (missing hardware, transport trouble, a
/// provider's "no data" answer) downgrades to "no result this cycle". This is
/// a best-effort polling sensor and temporary signal loss is normal.
pub trait LocationSource {
    /// The tag recorded on a resolved location when this source wins.
    fn kind(&self) -> SourceKind;

    /// Attempt to produce a reading. May block up to the source's own
    /// timeout (GPS stream wait, short network timeouts).
    fn acquire(&mut self) -> Option<Reading>;
}

/// Tries sources in fixed priority order and keeps the last success.
///
/// The resolver owns no acquisition state of its own; dedup and rate-limit
/// state live inside the individual sources.
pub struct Resolver {
    sources: Vec<Box<dyn LocationSource>>,
    last: Option<ResolvedLocation>,
}

impl Resolver {
    /// Build a resolver over an explicit, already-ordered source list.
    pub fn new(sources: Vec<Box<dyn LocationSource>>) -> Self {
        Self {
            sources,
            last: None,
        }
    }

    /// Build the standard source stack from configuration.
    ///
    /// Source order is fixed: GPS, platform location services, Wi-Fi lookup,
    /// IP lookup. Unavailable collaborators (no gpsd, no platform binding,
    /// no access-point scanner) are detected here, once, and leave the
    /// affected source permanently yielding `None`.
    pub fn from_config(config: &Config, signals: &SignalState) -> Result<Self> {
        let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(HTTP_TIMEOUT)?);

        let mut wifi_enabled = config.wifi_lookup();
        if wifi_enabled
            && config.wifi_provider().requires_api_key()
            && config.wifi_api_key().is_none()
        {
            log_pipe!();
            log_warning!(
                "WiFi provider '{}' requires an API key, disabling WiFi lookup",
                config.wifi_provider().as_str()
            );
            wifi_enabled = false;
        }

        let sources: Vec<Box<dyn LocationSource>> = vec![
            Box::new(GpsSource::new(
                crate::gpsd::connect_default(),
                config.gps_timeout(),
                signals.running.clone(),
            )),
            Box::new(PlatformLocationSource::detect()),
            Box::new(WifiSource::new(
                wifi_enabled,
                signals.online.clone(),
                scanner::detect_scanner(),
                config.wifi_provider(),
                config.wifi_api_key().map(str::to_owned),
                http.clone(),
            )),
            Box::new(IpSource::new(
                config.ip_lookup(),
                signals.online.clone(),
                config.ip_provider().config(),
                http,
            )),
        ];

        Ok(Self::new(sources))
    }

    /// Run one resolution cycle.
    ///
    /// Consults sources in order and short-circuits on the first reading.
    /// Returns `None` when every source comes up empty; that is the expected
    /// steady state when no signal is obtainable.
    pub fn resolve(&mut self) -> Option<ResolvedLocation> {
        for source in &mut self.sources {
            if let Some(reading) = source.acquire() {
                let resolved = ResolvedLocation {
                    reading,
                    source: source.kind(),
                    timestamp: Local::now(),
                };
                self.last = Some(resolved.clone());
                return Some(resolved);
            }
        }
        None
    }

    /// The most recent successful resolution, if any.
    pub fn last_known(&self) -> Option<&ResolvedLocation> {
        self.last.as_ref()
    }
}
