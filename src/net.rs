//! Narrow HTTP seam used by the Wi-Fi and IP lookup sources.
//!
//! Geolocation providers are plain request/response HTTP APIs, so the sources
//! only need two operations: a GET and a JSON POST. Putting them behind the
//! [`HttpTransport`] trait keeps the network out of the source state machines
//! and lets tests count and script requests.

use anyhow::{Context, Result};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// A completed HTTP exchange.
///
/// Non-2xx statuses are returned as a normal response rather than an error:
/// the Wi-Fi source needs to distinguish a provider's 404 ("no data for this
/// BSSID", a soft miss) from a transport failure.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP transport used by the lookup sources.
#[cfg_attr(test, automock)]
pub trait HttpTransport {
    /// Issue a GET request with optional extra headers.
    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse>;

    /// Issue a POST request with a JSON body.
    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse>;
}

/// Production transport backed by a blocking `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().with_context(|| format!("GET {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {url}"))?;
        Ok(HttpResponse { status, body })
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {url}"))?;
        Ok(HttpResponse { status, body })
    }
}
