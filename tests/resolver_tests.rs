//! End-to-end resolution tests against the public API.
//!
//! These exercise the real source implementations with stubbed collaborators:
//! an absent GPS feed, no platform binding, scripted access-point scans and a
//! scripted HTTP transport.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geolocr::config::{IpProvider, WifiProvider};
use geolocr::location::gps::GpsSource;
use geolocr::location::ip::IpSource;
use geolocr::location::platform::PlatformLocationSource;
use geolocr::location::scanner::{AccessPoint, AccessPointScan, AccessPointScanner};
use geolocr::location::wifi::WifiSource;
use geolocr::logger::Log;
use geolocr::net::{HttpResponse, HttpTransport};
use geolocr::{LocationSource, Resolver, SourceKind};

/// Transport that replays canned responses and counts requests.
struct ScriptedTransport {
    responses: Mutex<Vec<anyhow::Result<HttpResponse>>>,
    requests: Mutex<usize>,
}

impl ScriptedTransport {
    fn new(responses: Vec<anyhow::Result<HttpResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(0),
        })
    }

    fn request_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    fn next_response(&self) -> anyhow::Result<HttpResponse> {
        *self.requests.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            anyhow::bail!("no scripted response left");
        }
        responses.remove(0)
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, _url: &str, _headers: &[(String, String)]) -> anyhow::Result<HttpResponse> {
        self.next_response()
    }

    fn post_json(&self, _url: &str, _body: &serde_json::Value) -> anyhow::Result<HttpResponse> {
        self.next_response()
    }
}

struct FixedScanner {
    scan: Option<AccessPointScan>,
}

impl AccessPointScanner for FixedScanner {
    fn scan(&mut self) -> Option<AccessPointScan> {
        self.scan.clone()
    }
}

fn home_ap() -> AccessPointScan {
    AccessPointScan {
        current: AccessPoint {
            bssid: "a4:2b:b0:c1:d2:e3".to_string(),
            ssid: "HomeNet".to_string(),
            signal: -56,
            channel: None,
            noise: None,
            age: None,
        },
        neighbors: Vec::new(),
    }
}

fn online() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(true))
}

fn running() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(true))
}

fn unavailable_gps() -> Box<dyn LocationSource> {
    Box::new(GpsSource::new(None, Duration::from_millis(100), running()))
}

fn unavailable_platform() -> Box<dyn LocationSource> {
    Box::new(PlatformLocationSource::detect())
}

#[test]
fn ip_source_wins_when_everything_else_is_unavailable() {
    Log::set_enabled(false);

    let transport = ScriptedTransport::new(vec![Ok(HttpResponse {
        status: 200,
        body: r#"{"lat": 51.5, "lon": -0.1}"#.to_string(),
    })]);

    let wifi: Box<dyn LocationSource> = Box::new(WifiSource::new(
        false, // disabled
        online(),
        None,
        WifiProvider::Yandex,
        None,
        transport.clone(),
    ));
    let ip: Box<dyn LocationSource> = Box::new(IpSource::new(
        true,
        online(),
        IpProvider::IpApi.config(),
        transport.clone(),
    ));

    let mut resolver = Resolver::new(vec![unavailable_gps(), unavailable_platform(), wifi, ip]);

    let resolved = resolver.resolve().expect("resolution expected");
    assert_eq!(resolved.source, SourceKind::Ip);
    assert_eq!(resolved.reading.latitude, 51.5);
    assert_eq!(resolved.reading.longitude, -0.1);
    assert_eq!(resolved.reading.accuracy, None);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn all_sources_exhausted_is_not_found_without_panicking() {
    Log::set_enabled(false);

    let transport = ScriptedTransport::new(vec![]);
    let wifi: Box<dyn LocationSource> = Box::new(WifiSource::new(
        false,
        online(),
        None,
        WifiProvider::Yandex,
        None,
        transport.clone(),
    ));
    let ip: Box<dyn LocationSource> = Box::new(IpSource::new(
        false,
        online(),
        IpProvider::IpApi.config(),
        transport.clone(),
    ));

    let mut resolver = Resolver::new(vec![unavailable_gps(), unavailable_platform(), wifi, ip]);

    assert!(resolver.resolve().is_none());
    assert!(resolver.last_known().is_none());
    // Disabled network sources never touched the transport
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn wifi_outranks_ip_and_dedups_on_second_cycle() {
    Log::set_enabled(false);

    let transport = ScriptedTransport::new(vec![
        // First cycle: Wi-Fi lookup hit
        Ok(HttpResponse {
            status: 200,
            body: r#"<location latitude="52.370216" longitude="4.895168"/>"#.to_string(),
        }),
        // Second cycle: Wi-Fi dedups, IP answers
        Ok(HttpResponse {
            status: 200,
            body: r#"{"lat": 51.5, "lon": -0.1}"#.to_string(),
        }),
    ]);

    let wifi: Box<dyn LocationSource> = Box::new(WifiSource::new(
        true,
        online(),
        Some(Box::new(FixedScanner {
            scan: Some(home_ap()),
        })),
        WifiProvider::Yandex,
        None,
        transport.clone(),
    ));
    let ip: Box<dyn LocationSource> = Box::new(IpSource::new(
        true,
        online(),
        IpProvider::IpApi.config(),
        transport.clone(),
    ));

    let mut resolver = Resolver::new(vec![unavailable_gps(), unavailable_platform(), wifi, ip]);

    let first = resolver.resolve().expect("first resolution expected");
    assert_eq!(first.source, SourceKind::WiFi);
    assert_eq!(first.reading.latitude, 52.370216);

    // Unmoved device: the Wi-Fi source skips its provider and IP wins
    let second = resolver.resolve().expect("second resolution expected");
    assert_eq!(second.source, SourceKind::Ip);
    assert_eq!(transport.request_count(), 2);

    // The stored location reflects the latest success
    assert_eq!(resolver.last_known().unwrap().source, SourceKind::Ip);
}

#[test]
fn offline_mode_gates_network_sources() {
    Log::set_enabled(false);

    let transport = ScriptedTransport::new(vec![]);
    let offline = Arc::new(AtomicBool::new(false));

    let wifi: Box<dyn LocationSource> = Box::new(WifiSource::new(
        true,
        offline.clone(),
        Some(Box::new(FixedScanner {
            scan: Some(home_ap()),
        })),
        WifiProvider::Yandex,
        None,
        transport.clone(),
    ));
    let ip: Box<dyn LocationSource> = Box::new(IpSource::new(
        true,
        offline,
        IpProvider::IpApi.config(),
        transport.clone(),
    ));

    let mut resolver = Resolver::new(vec![wifi, ip]);
    assert!(resolver.resolve().is_none());
    assert_eq!(transport.request_count(), 0);
}
