//! Configuration system for geolocr with validation and provider selection.
//!
//! Configuration is loaded from `geolocr.toml` under the XDG config directory
//! (`$XDG_CONFIG_HOME/geolocr/geolocr.toml`). A missing file is not an error;
//! every option has a default. Invalid values produce helpful error messages.
//!
//! ```toml
//! #[Polling]
//! poll_interval = 10        # Seconds between resolution cycles (1-3600)
//! gps_timeout = 2.0         # Seconds to wait for a GPS fix each cycle
//!
//! #[WiFi lookup]
//! wifi_lookup = false       # Enable access-point reverse geolocation
//! wifi_provider = "yandex"  # Select: "yandex", "wigle", "mls", "gls"
//! wifi_api_key = ""         # Required by "wigle", "mls" and "gls"
//!
//! #[IP lookup]
//! ip_lookup = false         # Enable IP-address geolocation
//! ip_provider = "ip-api.com" # Select: "ip-api.com", "ipapi.co",
//!                            # "extreme-ip-lookup.com", "ipwhois.io",
//!                            # "geoplugin.net"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::constants::*;

/// Wi-Fi geolocation provider selection.
///
/// Each variant has its own request shape and response field mapping; see
/// `location::providers` for the per-provider lookup logic.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WifiProvider {
    /// Keyless single-AP reverse lookup by BSSID and signal strength.
    Yandex,
    /// Single-AP lookup requiring an API key and an exact SSID match.
    Wigle,
    /// Mozilla Location Services fingerprint batch lookup (API key).
    Mls,
    /// Google geolocation fingerprint batch lookup (API key).
    Gls,
}

impl WifiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WifiProvider::Yandex => "yandex",
            WifiProvider::Wigle => "wigle",
            WifiProvider::Mls => "mls",
            WifiProvider::Gls => "gls",
        }
    }

    /// Whether this provider cannot be queried without an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, WifiProvider::Yandex)
    }
}

/// IP geolocation provider selection.
///
/// All variants are plain GET endpoints returning flat JSON; they differ in
/// their field names and in the minimum polling interval derived from each
/// provider's published query quota.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum IpProvider {
    #[serde(rename = "ip-api.com")]
    IpApi,
    #[serde(rename = "ipapi.co")]
    IpapiCo,
    #[serde(rename = "extreme-ip-lookup.com")]
    ExtremeIpLookup,
    #[serde(rename = "ipwhois.io")]
    IpWhois,
    #[serde(rename = "geoplugin.net")]
    GeoPlugin,
}

impl IpProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpProvider::IpApi => "ip-api.com",
            IpProvider::IpapiCo => "ipapi.co",
            IpProvider::ExtremeIpLookup => "extreme-ip-lookup.com",
            IpProvider::IpWhois => "ipwhois.io",
            IpProvider::GeoPlugin => "geoplugin.net",
        }
    }
}

/// Configuration structure for geolocr application settings.
///
/// All fields are optional in the TOML file and fall back to defaults via the
/// accessor methods, which the rest of the application uses exclusively.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Seconds between resolution cycles in the polling loop.
    pub poll_interval: Option<u64>,
    /// Seconds the GPS source waits for a fix before yielding to the next source.
    pub gps_timeout: Option<f64>,

    /// Whether the Wi-Fi lookup source is enabled.
    pub wifi_lookup: Option<bool>,
    /// Which Wi-Fi geolocation provider to query.
    pub wifi_provider: Option<WifiProvider>,
    /// API key for providers that require one (wigle, mls, gls).
    pub wifi_api_key: Option<String>,

    /// Whether the IP lookup source is enabled.
    pub ip_lookup: Option<bool>,
    /// Which IP geolocation provider to query.
    pub ip_provider: Option<IpProvider>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: None,
            gps_timeout: None,
            wifi_lookup: None,
            wifi_provider: None,
            wifi_api_key: None,
            ip_lookup: None,
            ip_provider: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load(config_dir: Option<&str>) -> Result<Self> {
        let path = Self::config_path(config_dir)?;
        if !path.exists() {
            log_debug!("No configuration file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load and validate configuration from an explicit file path.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration file path, honoring a custom directory.
    pub fn config_path(config_dir: Option<&str>) -> Result<PathBuf> {
        if let Some(dir) = config_dir {
            return Ok(PathBuf::from(dir).join("geolocr.toml"));
        }
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("geolocr").join("geolocr.toml"))
    }

    /// Validate value ranges and provider/key consistency.
    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.poll_interval
            && !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&interval)
        {
            anyhow::bail!(
                "poll_interval must be between {MIN_POLL_INTERVAL_SECS} and \
                 {MAX_POLL_INTERVAL_SECS} seconds (got {interval})"
            );
        }
        if let Some(timeout) = self.gps_timeout
            && (!timeout.is_finite() || timeout <= 0.0 || timeout > MAX_GPS_TIMEOUT_SECS)
        {
            anyhow::bail!(
                "gps_timeout must be between 0 and {MAX_GPS_TIMEOUT_SECS} seconds (got {timeout})"
            );
        }
        Ok(())
    }

    // # Accessors with defaults

    pub fn poll_interval(&self) -> u64 {
        self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
    }

    pub fn gps_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.gps_timeout.unwrap_or(DEFAULT_GPS_TIMEOUT_SECS))
    }

    pub fn wifi_lookup(&self) -> bool {
        self.wifi_lookup.unwrap_or(false)
    }

    pub fn wifi_provider(&self) -> WifiProvider {
        self.wifi_provider.unwrap_or(WifiProvider::Yandex)
    }

    /// Return the API key, treating an empty string as unset.
    pub fn wifi_api_key(&self) -> Option<&str> {
        self.wifi_api_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn ip_lookup(&self) -> bool {
        self.ip_lookup.unwrap_or(false)
    }

    pub fn ip_provider(&self) -> IpProvider {
        self.ip_provider.unwrap_or(IpProvider::IpApi)
    }

    /// Log the active configuration in the standard indented block format.
    pub fn log_summary(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Poll interval: {}s", self.poll_interval());
        log_indented!("GPS fix timeout: {:.1}s", self.gps_timeout().as_secs_f64());
        if self.wifi_lookup() {
            log_indented!("WiFi lookup: enabled ({})", self.wifi_provider().as_str());
        } else {
            log_indented!("WiFi lookup: disabled");
        }
        if self.ip_lookup() {
            log_indented!("IP lookup: enabled ({})", self.ip_provider().as_str());
        } else {
            log_indented!("IP lookup: disabled");
        }
    }
}
