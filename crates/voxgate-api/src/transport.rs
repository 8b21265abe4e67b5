// Shared transport configuration for building reqwest::Client instances.
//
// Every SmartPlus surface (gateway, tenant REST, activities web API) goes
// through one client built here, so timeout and User-Agent settings live
// in a single place.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::Error;

/// The mobile-app User-Agent the vendor cloud expects on gateway and
/// tenant REST requests.
pub const APP_USER_AGENT: &str = "VBell/6.61.2 (iPhone; iOS 16.6; Scale/3.00)";

/// The embedded-web-view User-Agent used by the activities endpoints
/// (temp keys, door log).
pub const WEB_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) SmartPlus/6.2";

/// Fixed per-request timeout. Every call to the vendor cloud is bounded
/// by this; the variant fallback keys off the resulting timeout error.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))
    }
}

/// Accept-Language the vendor's mobile app sends on REST calls.
const ACCEPT_LANGUAGE: &str = "en-AU;q=1, he-AU;q=0.9, ru-RU;q=0.8";

/// Common headers for the mobile-app surfaces (gateway and tenant REST).
pub(crate) fn app_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("*/*"));
    headers.insert("accept-language", HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert("x-cloud-lang", HeaderValue::from_static("en"));
    headers
}

/// Common headers for the activities web API, which expects to be spoken
/// to like the vendor's embedded web view.
pub(crate) fn web_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-cloud-version", HeaderValue::from_static("6.4"));
    headers.insert(
        "accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert("accept-language", HeaderValue::from_static("en-AU,en;q=0.9"));
    headers.insert("x-cloud-lang", HeaderValue::from_static("en"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("user-agent", HeaderValue::from_static(WEB_USER_AGENT));
    headers
}
