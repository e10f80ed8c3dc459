//! Wi-Fi lookup source: reverse geolocation of the associated access point.
//!
//! The expensive part of this source is the remote provider query, so the
//! source remembers the BSSID it last looked up and skips the network when
//! the association has not changed. The dedup state is updated on both hits
//! and soft misses; only a transport failure leaves it untouched so the next
//! cycle retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::WifiProvider;
use crate::net::HttpTransport;

use super::providers::{self, LookupOutcome};
use super::reading::{Reading, SourceKind};
use super::resolver::LocationSource;
use super::scanner::AccessPointScanner;

pub struct WifiSource {
    enabled: bool,
    online: Arc<AtomicBool>,
    scanner: Option<Box<dyn AccessPointScanner>>,
    provider: WifiProvider,
    api_key: Option<String>,
    http: Arc<dyn HttpTransport>,
    /// BSSID of the last completed lookup, hit or miss. A stationary but
    /// unresolvable device is not re-queried every cycle.
    previous_bssid: Option<String>,
}

impl WifiSource {
    pub fn new(
        enabled: bool,
        online: Arc<AtomicBool>,
        scanner: Option<Box<dyn AccessPointScanner>>,
        provider: WifiProvider,
        api_key: Option<String>,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            enabled,
            online,
            scanner,
            provider,
            api_key,
            http,
            previous_bssid: None,
        }
    }
}

impl LocationSource for WifiSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WiFi
    }

    fn acquire(&mut self) -> Option<Reading> {
        if !self.enabled || !self.online.load(Ordering::SeqCst) {
            return None;
        }
        let scanner = self.scanner.as_mut()?;
        let scan = scanner.scan()?;

        if self.previous_bssid.as_deref() == Some(scan.current.bssid.as_str()) {
            log_debug!(
                "Access point {} unchanged, skipping lookup",
                scan.current.bssid
            );
            return None;
        }

        let outcome = providers::wifi_lookup(
            self.provider,
            self.api_key.as_deref(),
            &scan,
            self.http.as_ref(),
        );
        match outcome {
            LookupOutcome::Found(reading) => {
                self.previous_bssid = Some(scan.current.bssid);
                Some(reading)
            }
            LookupOutcome::NotFound => {
                // Soft miss: remember the BSSID anyway so an unmoved device
                // does not hammer the provider.
                self.previous_bssid = Some(scan.current.bssid);
                None
            }
            LookupOutcome::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::scanner::{AccessPoint, AccessPointScan, MockAccessPointScanner};
    use crate::net::{HttpResponse, MockHttpTransport};

    fn scan_for(bssid: &str) -> AccessPointScan {
        AccessPointScan {
            current: AccessPoint {
                bssid: bssid.to_string(),
                ssid: "HomeNet".to_string(),
                signal: -56,
                channel: None,
                noise: None,
                age: None,
            },
            neighbors: Vec::new(),
        }
    }

    fn yandex_hit() -> HttpResponse {
        HttpResponse {
            status: 200,
            body: r#"<location latitude="52.370216" longitude="4.895168"/>"#.to_string(),
        }
    }

    fn source(
        scanner: MockAccessPointScanner,
        http: MockHttpTransport,
        provider: WifiProvider,
        api_key: Option<&str>,
    ) -> WifiSource {
        WifiSource::new(
            true,
            Arc::new(AtomicBool::new(true)),
            Some(Box::new(scanner)),
            provider,
            api_key.map(str::to_owned),
            Arc::new(http),
        )
    }

    #[test]
    fn disabled_source_makes_no_calls() {
        let scanner = MockAccessPointScanner::new();
        let http = MockHttpTransport::new();
        let mut source = WifiSource::new(
            false,
            Arc::new(AtomicBool::new(true)),
            Some(Box::new(scanner)),
            WifiProvider::Yandex,
            None,
            Arc::new(http),
        );
        assert_eq!(source.acquire(), None);
    }

    #[test]
    fn offline_source_makes_no_calls() {
        let scanner = MockAccessPointScanner::new();
        let http = MockHttpTransport::new();
        let mut source = WifiSource::new(
            true,
            Arc::new(AtomicBool::new(false)),
            Some(Box::new(scanner)),
            WifiProvider::Yandex,
            None,
            Arc::new(http),
        );
        assert_eq!(source.acquire(), None);
    }

    #[test]
    fn unchanged_bssid_triggers_one_lookup() {
        let mut scanner = MockAccessPointScanner::new();
        scanner
            .expect_scan()
            .times(2)
            .returning(|| Some(scan_for("a4:2b:b0:c1:d2:e3")));

        let mut http = MockHttpTransport::new();
        // Exactly one network lookup across both calls
        http.expect_get().times(1).returning(|_, _| Ok(yandex_hit()));

        let mut source = source(scanner, http, WifiProvider::Yandex, None);
        assert!(source.acquire().is_some());
        assert_eq!(source.acquire(), None);
    }

    #[test]
    fn changed_bssid_triggers_new_lookup() {
        let mut scanner = MockAccessPointScanner::new();
        let mut bssids = vec!["a4:2b:b0:c1:d2:e3", "11:22:33:44:55:66"].into_iter();
        scanner
            .expect_scan()
            .times(2)
            .returning(move || Some(scan_for(bssids.next().unwrap())));

        let mut http = MockHttpTransport::new();
        http.expect_get().times(2).returning(|_, _| Ok(yandex_hit()));

        let mut source = source(scanner, http, WifiProvider::Yandex, None);
        assert!(source.acquire().is_some());
        assert!(source.acquire().is_some());
    }

    #[test]
    fn transport_failure_leaves_dedup_state_untouched() {
        let mut scanner = MockAccessPointScanner::new();
        scanner
            .expect_scan()
            .times(2)
            .returning(|| Some(scan_for("a4:2b:b0:c1:d2:e3")));

        let mut http = MockHttpTransport::new();
        let mut responses = vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(yandex_hit()),
        ]
        .into_iter();
        // Failed attempt is retried on the next cycle: two calls total
        http.expect_get()
            .times(2)
            .returning(move |_, _| responses.next().unwrap());

        let mut source = source(scanner, http, WifiProvider::Yandex, None);
        assert_eq!(source.acquire(), None);
        assert!(source.acquire().is_some());
    }

    #[test]
    fn soft_miss_updates_dedup_state() {
        let mut scanner = MockAccessPointScanner::new();
        scanner
            .expect_scan()
            .times(2)
            .returning(|| Some(scan_for("a4:2b:b0:c1:d2:e3")));

        let mut http = MockHttpTransport::new();
        // A 404 is a soft miss: state updates, the second cycle is a dedup hit
        http.expect_get().times(1).returning(|_, _| {
            Ok(HttpResponse {
                status: 404,
                body: String::new(),
            })
        });

        let mut source = source(scanner, http, WifiProvider::Yandex, None);
        assert_eq!(source.acquire(), None);
        assert_eq!(source.acquire(), None);
    }

    #[test]
    fn wigle_requires_matching_ssid() {
        let mut scanner = MockAccessPointScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|| Some(scan_for("a4:2b:b0:c1:d2:e3")));

        let mut http = MockHttpTransport::new();
        http.expect_get().times(1).returning(|_, _| {
            Ok(HttpResponse {
                status: 200,
                body: r#"{
                    "success": true,
                    "results": [{
                        "ssid": "SomeOtherNet",
                        "locationData": [{"latitude": 52.37, "longitude": 4.89}]
                    }]
                }"#
                .to_string(),
            })
        });

        let mut source = source(scanner, http, WifiProvider::Wigle, Some("dGVzdA=="));
        assert_eq!(source.acquire(), None);
    }

    #[test]
    fn fingerprint_provider_returns_accuracy() {
        let mut scanner = MockAccessPointScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|| Some(scan_for("a4:2b:b0:c1:d2:e3")));

        let mut http = MockHttpTransport::new();
        http.expect_post_json().times(1).returning(|_, _| {
            Ok(HttpResponse {
                status: 200,
                body: r#"{"location": {"lat": 52.37, "lng": 4.89}, "accuracy": 30.0}"#.to_string(),
            })
        });

        let mut source = source(scanner, http, WifiProvider::Gls, Some("key"));
        let reading = source.acquire().expect("reading expected");
        assert_eq!(reading.latitude, 52.37);
        assert_eq!(reading.accuracy, Some(30.0));
    }

    #[test]
    fn absent_scanner_yields_none() {
        let http = MockHttpTransport::new();
        let mut source = WifiSource::new(
            true,
            Arc::new(AtomicBool::new(true)),
            None,
            WifiProvider::Yandex,
            None,
            Arc::new(http),
        );
        assert_eq!(source.acquire(), None);
    }
}
