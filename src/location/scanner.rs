//! Access-point fingerprint extraction from the OS network stack.
//!
//! A scanner answers one question: which access point is this machine
//! associated with right now, and what does it look like? The answer comes
//! from parsing platform network-utility output (`ip route` + `iwconfig` on
//! Linux, `airport -I` on macOS). Subprocess invocation is delegated to a
//! [`CommandRunner`] so the parsers stay pure and testable.

use anyhow::{Context, Result};
use regex::Regex;

#[cfg(test)]
use mockall::automock;

/// Observed attributes of one access point.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    /// Hardware identifier, colon-separated lowercase hex octets
    pub bssid: String,
    pub ssid: String,
    /// Signal strength in dBm
    pub signal: i32,
    pub channel: Option<u32>,
    /// Noise floor in dBm
    pub noise: Option<i32>,
    /// Seconds since the observation, when the platform reports it
    pub age: Option<u64>,
}

/// The current association plus any neighboring access points the platform
/// exposed. Neighbors enrich fingerprint batch lookups (mls/gls); single-AP
/// providers ignore them.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPointScan {
    pub current: AccessPoint,
    pub neighbors: Vec<AccessPoint>,
}

/// Collaborator producing a structured fingerprint of the current Wi-Fi
/// association, or `None` when the network state is absent or ambiguous.
#[cfg_attr(test, automock)]
pub trait AccessPointScanner {
    fn scan(&mut self) -> Option<AccessPointScan>;
}

/// Runs an OS network-utility command and captures its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Production runner using `std::process::Command`.
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {program}"))?;
        if !output.status.success() {
            anyhow::bail!("{program} exited with {}", output.status);
        }
        String::from_utf8(output.stdout).with_context(|| format!("{program} output not UTF-8"))
    }
}

/// Select the scanner variant for the current host, if any.
pub fn detect_scanner() -> Option<Box<dyn AccessPointScanner>> {
    if cfg!(target_os = "linux") {
        Some(Box::new(LinuxScanner::new(Box::new(SystemCommandRunner))))
    } else if cfg!(target_os = "macos") {
        Some(Box::new(MacScanner::new(Box::new(SystemCommandRunner))))
    } else {
        log_debug!("Access-point detection not supported on this platform");
        None
    }
}

// # Linux

/// Scanner for Linux: default-route interface via `ip route`, association
/// details via `iwconfig`.
pub struct LinuxScanner {
    runner: Box<dyn CommandRunner>,
}

impl LinuxScanner {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl AccessPointScanner for LinuxScanner {
    fn scan(&mut self) -> Option<AccessPointScan> {
        let route_output = match self.runner.run("ip", &["route", "show", "default"]) {
            Ok(output) => output,
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to query default route: {e:#}");
                return None;
            }
        };

        let interfaces = parse_default_interfaces(&route_output);
        if interfaces.len() != 1 {
            log_warning!(
                "Expected exactly one default route interface, found {}",
                interfaces.len()
            );
            return None;
        }

        let iwconfig_output = match self.runner.run("iwconfig", &[&interfaces[0]]) {
            Ok(output) => output,
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to query wireless state: {e:#}");
                return None;
            }
        };

        parse_iwconfig(&iwconfig_output).map(|current| AccessPointScan {
            current,
            neighbors: Vec::new(),
        })
    }
}

/// Extract the deduplicated set of default-route interface names.
pub fn parse_default_interfaces(output: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^default via [0-9.]+ dev (\S+)").unwrap();
    let mut interfaces: Vec<String> = re
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect();
    interfaces.sort();
    interfaces.dedup();
    interfaces
}

/// Parse `iwconfig` output into an access-point fingerprint.
///
/// Zero detected access points is a failure; more than one logs a warning
/// but proceeds with the first.
pub fn parse_iwconfig(output: &str) -> Option<AccessPoint> {
    let ssid_re = Regex::new(r#"ESSID:"(.*)""#).unwrap();
    let bssid_re = Regex::new(r"Access Point: ([0-9a-fA-F:]+)").unwrap();
    let signal_re = Regex::new(r"Signal level=(-[0-9]+) dBm").unwrap();

    let bssids: Vec<&str> = bssid_re
        .captures_iter(output)
        .map(|caps| caps.get(1).unwrap().as_str())
        .collect();
    if bssids.is_empty() {
        log_warning!("No access point BSSID detected");
        return None;
    }
    if bssids.len() > 1 {
        log_warning!("More than one access point BSSID detected, using the first");
    }

    let signals: Vec<&str> = signal_re
        .captures_iter(output)
        .map(|caps| caps.get(1).unwrap().as_str())
        .collect();
    if signals.is_empty() {
        log_warning!("No access point signal level detected");
        return None;
    }

    let ssid = ssid_re
        .captures(output)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();

    Some(AccessPoint {
        bssid: bssids[0].to_lowercase(),
        ssid,
        signal: signals[0].parse().ok()?,
        channel: None,
        noise: None,
        age: None,
    })
}

// # macOS

/// Scanner for macOS using the private `airport` utility.
pub struct MacScanner {
    runner: Box<dyn CommandRunner>,
}

const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/A/Resources/airport";

impl MacScanner {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl AccessPointScanner for MacScanner {
    fn scan(&mut self) -> Option<AccessPointScan> {
        let output = match self.runner.run(AIRPORT_PATH, &["-I"]) {
            Ok(output) => output,
            Err(e) => {
                log_pipe!();
                log_warning!("Failed to query wireless state: {e:#}");
                return None;
            }
        };

        parse_airport_info(&output).map(|current| AccessPointScan {
            current,
            neighbors: Vec::new(),
        })
    }
}

/// Parse `airport -I` output into an access-point fingerprint.
pub fn parse_airport_info(output: &str) -> Option<AccessPoint> {
    let ssid_re = Regex::new(r"(?m)^ *SSID: (.*)$").unwrap();
    let bssid_re = Regex::new(r"(?m)^ *BSSID: ([0-9a-fA-F:]+)$").unwrap();
    let channel_re = Regex::new(r"(?m)^ *channel: ([0-9]+)").unwrap();
    let signal_re = Regex::new(r"(?m)^ *agrCtlRSSI: (-[0-9]+)$").unwrap();
    let noise_re = Regex::new(r"(?m)^ *agrCtlNoise: (-[0-9]+)$").unwrap();

    let bssids: Vec<&str> = bssid_re
        .captures_iter(output)
        .map(|caps| caps.get(1).unwrap().as_str())
        .collect();
    if bssids.is_empty() {
        log_warning!("No access point BSSID detected");
        return None;
    }
    if bssids.len() > 1 {
        log_warning!("More than one access point BSSID detected, using the first");
    }

    let signal: i32 = signal_re.captures(output)?[1].parse().ok()?;
    let ssid = ssid_re
        .captures(output)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();
    let channel = channel_re
        .captures(output)
        .and_then(|caps| caps[1].parse().ok());
    let noise = noise_re
        .captures(output)
        .and_then(|caps| caps[1].parse().ok());

    Some(AccessPoint {
        bssid: pad_bssid_octets(bssids[0]).to_lowercase(),
        ssid,
        signal,
        channel,
        noise,
        age: Some(0),
    })
}

/// `airport` prints single-digit BSSID octets without a leading zero; pad
/// them so lookups use the canonical form.
pub fn pad_bssid_octets(bssid: &str) -> String {
    bssid
        .split(':')
        .map(|octet| {
            if octet.len() == 1 {
                format!("0{octet}")
            } else {
                octet.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(":")
}
