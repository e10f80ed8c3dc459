//! IP lookup source: geolocation of the device's external address.
//!
//! Providers impose strict query quotas, so the source keeps the time of the
//! last successful lookup and refuses to touch the network again before the
//! provider's minimum interval has elapsed. Failures do not consume quota:
//! the timestamp only advances after a reading was actually produced.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::net::HttpTransport;

use super::providers::{IpProviderConfig, json_number};
use super::reading::{Reading, SourceKind};
use super::resolver::LocationSource;

pub struct IpSource {
    enabled: bool,
    online: Arc<AtomicBool>,
    provider: &'static IpProviderConfig,
    http: Arc<dyn HttpTransport>,
    /// Time of the last successful lookup; `None` until the first one.
    last_lookup: Option<Instant>,
}

impl IpSource {
    pub fn new(
        enabled: bool,
        online: Arc<AtomicBool>,
        provider: &'static IpProviderConfig,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            enabled,
            online,
            provider,
            http,
            last_lookup: None,
        }
    }
}

impl LocationSource for IpSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Ip
    }

    fn acquire(&mut self) -> Option<Reading> {
        if !self.enabled || !self.online.load(Ordering::SeqCst) {
            return None;
        }

        if let Some(last) = self.last_lookup
            && last.elapsed() < self.provider.min_poll_interval
        {
            log_debug!("Rate limit for {} not yet elapsed", self.provider.name);
            return None;
        }

        let response = match self.http.get(self.provider.url, &[]) {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                log_pipe!();
                log_error!(
                    "IP provider {} returned HTTP {}",
                    self.provider.name,
                    response.status
                );
                return None;
            }
            Err(e) => {
                log_pipe!();
                log_error!("IP provider request failed: {e:#}");
                return None;
            }
        };

        let Ok(data) = serde_json::from_str::<Value>(&response.body) else {
            log_pipe!();
            log_error!("IP provider {} returned malformed JSON", self.provider.name);
            return None;
        };

        let latitude = data.get(self.provider.latitude_key).and_then(json_number)?;
        let longitude = data.get(self.provider.longitude_key).and_then(json_number)?;
        let accuracy = self
            .provider
            .accuracy_key
            .and_then(|key| data.get(key))
            .and_then(json_number);

        let reading = Reading::checked(latitude, longitude)?.with_accuracy(accuracy);
        self.last_lookup = Some(Instant::now());
        Some(reading)
    }
}
