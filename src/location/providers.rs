//! Geolocation provider tables and response mapping.
//!
//! Wi-Fi providers differ in request shape (query string vs. JSON body,
//! API key placement) and in where coordinates live in the response; IP
//! providers are uniform GET-plus-flat-JSON endpoints differing only in
//! field names and query quotas. Everything here is stateless: the sources
//! own the dedup and rate-limit state.

use regex::Regex;
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::{IpProvider, WifiProvider};
use crate::net::HttpTransport;

use super::reading::Reading;
use super::scanner::AccessPointScan;

/// Outcome of one provider lookup.
#[derive(Debug, PartialEq)]
pub enum LookupOutcome {
    /// The provider returned coordinates.
    Found(Reading),
    /// The provider explicitly knows nothing about this query (soft miss).
    NotFound,
    /// Transport trouble or an unexpected response; the attempt should be
    /// retried on a later cycle.
    Failed,
}

/// Interpret a JSON value that may encode a number as a string, which
/// several providers do.
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// # Wi-Fi providers

/// Query the configured Wi-Fi provider for the scanned access point.
pub fn wifi_lookup(
    provider: WifiProvider,
    api_key: Option<&str>,
    scan: &AccessPointScan,
    http: &dyn HttpTransport,
) -> LookupOutcome {
    match provider {
        WifiProvider::Yandex => yandex_lookup(scan, http),
        WifiProvider::Wigle => match api_key {
            Some(key) => wigle_lookup(key, scan, http),
            None => LookupOutcome::Failed,
        },
        WifiProvider::Mls | WifiProvider::Gls => match api_key {
            Some(key) => fingerprint_lookup(provider, key, scan, http),
            None => LookupOutcome::Failed,
        },
    }
}

/// Keyless single-AP reverse lookup. The response is XML; coordinates are
/// pulled out of the attribute text directly.
fn yandex_lookup(scan: &AccessPointScan, http: &dyn HttpTransport) -> LookupOutcome {
    let bssid_compact = scan.current.bssid.replace(':', "");
    let url = format!(
        "http://mobile.maps.yandex.net/cellid_location/?wifinetworks={}:{}",
        bssid_compact, scan.current.signal
    );

    let response = match http.get(&url, &[]) {
        Ok(response) => response,
        Err(e) => {
            log_pipe!();
            log_error!("WiFi provider request failed: {e:#}");
            return LookupOutcome::Failed;
        }
    };

    if response.status == 404 {
        log_debug!("No location known for BSSID {}", scan.current.bssid);
        return LookupOutcome::NotFound;
    }
    if !response.is_success() {
        log_pipe!();
        log_error!("WiFi provider returned HTTP {}", response.status);
        return LookupOutcome::Failed;
    }

    match parse_yandex_body(&response.body).and_then(|(lat, lon)| Reading::checked(lat, lon)) {
        Some(reading) => LookupOutcome::Found(reading),
        None => {
            log_debug!("No location in response for BSSID {}", scan.current.bssid);
            LookupOutcome::NotFound
        }
    }
}

pub(crate) fn parse_yandex_body(body: &str) -> Option<(f64, f64)> {
    let lat_re = Regex::new(r#"latitude="(-?[0-9.]+)""#).unwrap();
    let lon_re = Regex::new(r#"longitude="(-?[0-9.]+)""#).unwrap();
    let lat = lat_re.captures(body)?[1].parse().ok()?;
    let lon = lon_re.captures(body)?[1].parse().ok()?;
    Some((lat, lon))
}

/// Single-AP lookup against the WiGLE network database. Requires an exact
/// SSID match in the response before the coordinates are trusted.
fn wigle_lookup(api_key: &str, scan: &AccessPointScan, http: &dyn HttpTransport) -> LookupOutcome {
    let url = format!(
        "https://api.wigle.net/api/v2/network/detail?netid={}&type=wifi",
        scan.current.bssid
    );
    let headers = [("Authorization".to_string(), format!("Basic {api_key}"))];

    let response = match http.get(&url, &headers) {
        Ok(response) => response,
        Err(e) => {
            log_pipe!();
            log_error!("WiFi provider request failed: {e:#}");
            return LookupOutcome::Failed;
        }
    };
    if !response.is_success() {
        log_pipe!();
        log_error!("WiFi provider returned HTTP {}", response.status);
        return LookupOutcome::Failed;
    }

    match parse_wigle_body(&response.body, &scan.current.ssid)
        .and_then(|(lat, lon)| Reading::checked(lat, lon))
    {
        Some(reading) => LookupOutcome::Found(reading),
        None => {
            log_debug!("No location found for BSSID {}", scan.current.bssid);
            LookupOutcome::NotFound
        }
    }
}

pub(crate) fn parse_wigle_body(body: &str, ssid: &str) -> Option<(f64, f64)> {
    let data: Value = serde_json::from_str(body).ok()?;
    if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let first = data.get("results")?.as_array()?.first()?;
    if first.get("ssid").and_then(Value::as_str) != Some(ssid) {
        return None;
    }
    let location = first.get("locationData")?.as_array()?.first()?;
    let lat = json_number(location.get("latitude")?)?;
    let lon = json_number(location.get("longitude")?)?;
    Some((lat, lon))
}

/// Multi-AP fingerprint batch lookup (Mozilla and Google share the same
/// geolocate request and response shape).
fn fingerprint_lookup(
    provider: WifiProvider,
    api_key: &str,
    scan: &AccessPointScan,
    http: &dyn HttpTransport,
) -> LookupOutcome {
    let url = match provider {
        WifiProvider::Mls => {
            format!("https://location.services.mozilla.com/v1/geolocate?key={api_key}")
        }
        _ => format!("https://www.googleapis.com/geolocation/v1/geolocate?key={api_key}"),
    };
    let body = fingerprint_body(scan);

    let response = match http.post_json(&url, &body) {
        Ok(response) => response,
        Err(e) => {
            log_pipe!();
            log_error!("WiFi provider request failed: {e:#}");
            return LookupOutcome::Failed;
        }
    };
    if !response.is_success() {
        log_pipe!();
        log_error!("WiFi provider returned HTTP {}", response.status);
        return LookupOutcome::Failed;
    }

    let Ok(data) = serde_json::from_str::<Value>(&response.body) else {
        log_pipe!();
        log_error!("WiFi provider returned malformed JSON");
        return LookupOutcome::Failed;
    };

    if let Some(location) = data.get("location")
        && let Some(accuracy) = data.get("accuracy").and_then(json_number)
    {
        let reading = location
            .get("lat")
            .and_then(json_number)
            .zip(location.get("lng").and_then(json_number))
            .and_then(|(lat, lng)| Reading::checked(lat, lng));
        if let Some(reading) = reading {
            return LookupOutcome::Found(reading.with_accuracy(Some(accuracy)));
        }
    }

    if let Some(message) = data
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
    {
        log_pipe!();
        log_error!("WiFi provider error: {message}");
    } else {
        log_debug!("No location found for BSSID {}", scan.current.bssid);
    }
    LookupOutcome::NotFound
}

pub(crate) fn fingerprint_body(scan: &AccessPointScan) -> Value {
    let access_points: Vec<Value> = std::iter::once(&scan.current)
        .chain(scan.neighbors.iter())
        .map(|ap| {
            json!({
                "macAddress": ap.bssid,
                "age": ap.age.unwrap_or(0),
                "channel": ap.channel.unwrap_or(0),
                "signalStrength": ap.signal,
                "signalToNoiseRatio": ap.noise.unwrap_or(0),
            })
        })
        .collect();
    json!({ "wifiAccessPoints": access_points })
}

// # IP providers

/// Static description of one IP geolocation endpoint.
pub struct IpProviderConfig {
    pub name: &'static str,
    pub url: &'static str,
    pub latitude_key: &'static str,
    pub longitude_key: &'static str,
    pub accuracy_key: Option<&'static str>,
    /// Minimum spacing between successful queries, derived from the
    /// provider's published quota.
    pub min_poll_interval: Duration,
}

// Quotas: ip-api.com 45/min, ipapi.co 1000/day, extreme-ip-lookup.com and
// ipwhois.io 10000/month, geoplugin.net 100000/day.
static IP_API: IpProviderConfig = IpProviderConfig {
    name: "ip-api.com",
    url: "http://ip-api.com/json/?fields=49344",
    latitude_key: "lat",
    longitude_key: "lon",
    accuracy_key: None,
    min_poll_interval: Duration::from_millis(1334),
};

static IPAPI_CO: IpProviderConfig = IpProviderConfig {
    name: "ipapi.co",
    url: "https://ipapi.co/json/",
    latitude_key: "latitude",
    longitude_key: "longitude",
    accuracy_key: None,
    min_poll_interval: Duration::from_millis(86_400),
};

static EXTREME_IP_LOOKUP: IpProviderConfig = IpProviderConfig {
    name: "extreme-ip-lookup.com",
    url: "https://extreme-ip-lookup.com/json/",
    latitude_key: "lat",
    longitude_key: "lon",
    accuracy_key: None,
    min_poll_interval: Duration::from_millis(267_840),
};

static IP_WHOIS: IpProviderConfig = IpProviderConfig {
    name: "ipwhois.io",
    url: "https://ipwhois.app/json/?objects=latitude,longitude",
    latitude_key: "latitude",
    longitude_key: "longitude",
    accuracy_key: None,
    min_poll_interval: Duration::from_millis(267_840),
};

static GEO_PLUGIN: IpProviderConfig = IpProviderConfig {
    name: "geoplugin.net",
    url: "http://www.geoplugin.net/json.gp",
    latitude_key: "geoplugin_latitude",
    longitude_key: "geoplugin_longitude",
    accuracy_key: Some("geoplugin_locationAccuracyRadius"),
    min_poll_interval: Duration::from_millis(864),
};

impl IpProvider {
    /// The endpoint description for this provider.
    pub fn config(&self) -> &'static IpProviderConfig {
        match self {
            IpProvider::IpApi => &IP_API,
            IpProvider::IpapiCo => &IPAPI_CO,
            IpProvider::ExtremeIpLookup => &EXTREME_IP_LOOKUP,
            IpProvider::IpWhois => &IP_WHOIS,
            IpProvider::GeoPlugin => &GEO_PLUGIN,
        }
    }
}
