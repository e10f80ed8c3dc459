//! TCP transport adapter for the GPS daemon.
//!
//! Connects to gpsd, enables JSON watch mode and decodes the newline-framed
//! report stream into the typed [`GpsReport`]s the GPS source consumes. The
//! socket stays non-blocking; complete lines accumulate in an internal queue
//! so `waiting()` can answer without stalling the resolution cycle.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::constants::{GPSD_HOST, GPSD_PORT};
use crate::location::gps::{GpsReport, GpsdFeed};

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";
const READ_RETRY_SLEEP: Duration = Duration::from_millis(50);

pub struct GpsdSocket {
    stream: TcpStream,
    buffer: Vec<u8>,
    pending: VecDeque<GpsReport>,
}

impl GpsdSocket {
    /// Connect and enable watch mode.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let mut stream = TcpStream::connect((host, port))
            .with_context(|| format!("Can't connect to gpsd at {host}:{port}"))?;
        stream
            .write_all(WATCH_COMMAND)
            .context("Failed to enable gpsd watch mode")?;
        stream
            .set_nonblocking(true)
            .context("Failed to set gpsd socket non-blocking")?;
        Ok(Self {
            stream,
            buffer: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    /// Drain whatever the socket has buffered into the pending report queue.
    /// Returns an error only on EOF or a real socket failure.
    fn fill_pending(&mut self) -> Result<()> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => anyhow::bail!("gpsd closed the connection"),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    self.extract_lines();
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("gpsd socket read failed"),
            }
        }
    }

    /// Decode every complete line currently in the buffer.
    fn extract_lines(&mut self) {
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let Ok(text) = std::str::from_utf8(&line) else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(value) => self.pending.push_back(report_from_value(&value)),
                Err(_) => log_debug!("Discarding undecodable gpsd line"),
            }
        }
    }
}

impl GpsdFeed for GpsdSocket {
    fn waiting(&mut self) -> bool {
        if self.pending.is_empty() {
            // A connection error here surfaces on the next blocking read
            let _ = self.fill_pending();
        }
        !self.pending.is_empty()
    }

    fn next_report(&mut self) -> Result<GpsReport> {
        loop {
            if let Some(report) = self.pending.pop_front() {
                return Ok(report);
            }
            self.fill_pending()?;
            if self.pending.is_empty() {
                std::thread::sleep(READ_RETRY_SLEEP);
            }
        }
    }
}

/// Connect to the default gpsd endpoint, degrading GPS to unavailable when
/// the daemon refuses the connection.
pub fn connect_default() -> Option<Box<dyn GpsdFeed>> {
    match GpsdSocket::connect(GPSD_HOST, GPSD_PORT) {
        Ok(socket) => Some(Box::new(socket)),
        Err(e) => {
            log_pipe!();
            log_warning!("{e:#}");
            None
        }
    }
}

/// Map a decoded gpsd JSON object onto the typed report set.
pub fn report_from_value(value: &Value) -> GpsReport {
    let class = value.get("class").and_then(Value::as_str).unwrap_or("");
    match class {
        "DEVICES" => GpsReport::Devices {
            count: value
                .get("devices")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
        },
        "DEVICE" => GpsReport::Device {
            connected: device_is_activated(value.get("activated")),
        },
        "TPV" => GpsReport::Tpv {
            mode: value.get("mode").and_then(Value::as_u64).unwrap_or(0) as u8,
            lat: value.get("lat").and_then(Value::as_f64),
            lon: value.get("lon").and_then(Value::as_f64),
            epx: value.get("epx").and_then(Value::as_f64),
            epy: value.get("epy").and_then(Value::as_f64),
            alt: value.get("alt").and_then(Value::as_f64),
            track: value.get("track").and_then(Value::as_f64),
            speed: value.get("speed").and_then(Value::as_f64),
        },
        "SKY" => GpsReport::Sky {
            satellites: value
                .get("satellites")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
        },
        "VERSION" => GpsReport::Version,
        "WATCH" => GpsReport::Watch,
        other => GpsReport::Other(other.to_string()),
    }
}

/// gpsd reports `activated` as an activation timestamp, or zero when the
/// device deactivated.
fn device_is_activated(activated: Option<&Value>) -> bool {
    match activated {
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => s != "0",
        Some(_) | None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn devices_report_counts_entries() {
        let value = json!({"class": "DEVICES", "devices": [{"path": "/dev/ttyACM0"}]});
        assert_eq!(report_from_value(&value), GpsReport::Devices { count: 1 });
    }

    #[test]
    fn device_activation_states() {
        let activated = json!({"class": "DEVICE", "activated": "2025-06-01T12:00:00.000Z"});
        assert_eq!(
            report_from_value(&activated),
            GpsReport::Device { connected: true }
        );

        let deactivated = json!({"class": "DEVICE", "activated": 0});
        assert_eq!(
            report_from_value(&deactivated),
            GpsReport::Device { connected: false }
        );
    }

    #[test]
    fn tpv_report_maps_fields() {
        let value = json!({
            "class": "TPV", "mode": 3,
            "lat": 52.379, "lon": 4.900,
            "epx": 4.0, "epy": 9.5, "alt": 2.0,
            "track": 181.0, "speed": 0.5
        });
        assert_eq!(
            report_from_value(&value),
            GpsReport::Tpv {
                mode: 3,
                lat: Some(52.379),
                lon: Some(4.900),
                epx: Some(4.0),
                epy: Some(9.5),
                alt: Some(2.0),
                track: Some(181.0),
                speed: Some(0.5),
            }
        );
    }

    #[test]
    fn tpv_without_optional_fields() {
        let value = json!({"class": "TPV", "mode": 1});
        assert_eq!(
            report_from_value(&value),
            GpsReport::Tpv {
                mode: 1,
                lat: None,
                lon: None,
                epx: None,
                epy: None,
                alt: None,
                track: None,
                speed: None,
            }
        );
    }

    #[test]
    fn sky_without_satellites_reports_zero() {
        let value = json!({"class": "SKY"});
        assert_eq!(report_from_value(&value), GpsReport::Sky { satellites: 0 });
    }

    #[test]
    fn unknown_class_is_preserved() {
        let value = json!({"class": "TOFF"});
        assert_eq!(
            report_from_value(&value),
            GpsReport::Other("TOFF".to_string())
        );
    }
}
