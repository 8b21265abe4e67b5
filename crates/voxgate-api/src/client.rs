//! HTTP client for the SmartPlus cloud.
//!
//! One [`CloudClient`] serves one account. The vendor splits its API over
//! three surfaces: a fixed bootstrap gateway, a per-tenant REST host
//! resolved at runtime, and a web-style "activities" API segmented by
//! deployment variant. All three share the request wrapper here, which
//! normalizes the two response envelopes and runs the variant fallback
//! on timeouts.

use std::sync::RwLock;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::Error;
use crate::session::{DeploymentVariant, Session};
use crate::transport::TransportConfig;

/// Bootstrap gateway shared by all regions.
pub const GATEWAY_BASE: &str = "https://gate.ecloud.akuvox.com:8600";

/// Activities API base. The literal `subdomain.` label is replaced with
/// the session's regional subdomain on every request.
pub const APP_BASE: &str = "https://subdomain.akuvox.com/web/app";

/// Client for one SmartPlus account.
///
/// Cheap to share behind an `Arc`. Session state lives behind an
/// `RwLock` because responses update tokens and timeouts flip the
/// deployment variant while callers only ever need snapshots.
#[derive(Debug)]
pub struct CloudClient {
    http: reqwest::Client,
    gateway_base: String,
    app_base: String,
    session: RwLock<Session>,
    timeout_secs: u64,
}

/// Request body shapes the cloud accepts.
pub(crate) enum Payload {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

impl CloudClient {
    /// Build a client against the production cloud endpoints.
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        Self::with_bases(config, GATEWAY_BASE, APP_BASE)
    }

    /// Build a client against explicit gateway and activities bases.
    ///
    /// The activities base must not include the deployment-variant
    /// segment; it is appended per request. Integration tests point both
    /// bases at local mock servers.
    pub fn with_bases(
        config: &TransportConfig,
        gateway_base: impl Into<String>,
        app_base: impl Into<String>,
    ) -> Result<Self, Error> {
        let gateway_base = gateway_base.into().trim_end_matches('/').to_owned();
        let app_base = app_base.into().trim_end_matches('/').to_owned();
        Url::parse(&gateway_base)?;
        Url::parse(&app_base)?;
        Ok(Self {
            http: config.build_client()?,
            gateway_base,
            app_base,
            session: RwLock::new(Session::default()),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    // ── Session access ──────────────────────────────────────────────

    /// Snapshot of the current session state.
    pub fn session(&self) -> Session {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// Replace the whole session, e.g. when restoring persisted state.
    pub fn restore_session(&self, session: Session) {
        *self.session.write().expect("session lock poisoned") = session;
    }

    /// Mutate the session under the write lock.
    pub fn update_session(&self, apply: impl FnOnce(&mut Session)) {
        let mut session = self.session.write().expect("session lock poisoned");
        apply(&mut session);
    }

    /// The deployment variant the activities endpoints currently target.
    pub fn deployment_variant(&self) -> DeploymentVariant {
        self.session
            .read()
            .expect("session lock poisoned")
            .deployment_variant
    }

    pub(crate) fn set_deployment_variant(&self, variant: DeploymentVariant) {
        self.session
            .write()
            .expect("session lock poisoned")
            .deployment_variant = variant;
    }

    // ── URL construction ────────────────────────────────────────────

    /// URL on the bootstrap gateway.
    pub(crate) fn gateway_url(&self, path: &str) -> String {
        format!("{}/{path}", self.gateway_base)
    }

    /// URL on the tenant REST host resolved during bootstrap.
    ///
    /// The scheme follows the gateway base so a client pointed at a
    /// plain-HTTP test server stays on HTTP throughout.
    pub(crate) fn tenant_url(&self, path_and_query: &str) -> String {
        let scheme = self.gateway_base.split("://").next().unwrap_or("https");
        let host = self.session.read().expect("session lock poisoned").host.clone();
        format!("{scheme}://{host}/{path_and_query}")
    }

    /// Activities URL for the current deployment variant.
    pub fn activities_url(&self, path: &str) -> String {
        let variant = self.deployment_variant();
        format!("{}/{}/{path}", self.app_base, variant.path_segment())
    }

    /// Substitute the regional subdomain into a templated URL. URLs
    /// without the placeholder pass through untouched.
    fn apply_subdomain(&self, url: &str) -> String {
        let subdomain = self
            .session
            .read()
            .expect("session lock poisoned")
            .subdomain
            .clone();
        url.replace("subdomain.", &format!("{subdomain}."))
    }

    // ── Request wrapper ─────────────────────────────────────────────

    /// Send a request and normalize the cloud's response envelope.
    ///
    /// `Ok(None)` means the response was unusable (unexpected status or
    /// shape) but not worth failing the caller over; `Ok(Some(value))`
    /// carries the stripped payload. HTTP 401 surfaces as
    /// [`Error::Authentication`], timeouts as [`Error::Timeout`] after
    /// the variant fallback has had its chance.
    pub(crate) async fn request_json(
        &self,
        method: &Method,
        url: String,
        headers: HeaderMap,
        payload: Payload,
    ) -> Result<Option<Value>, Error> {
        let url = self.apply_subdomain(&url);
        debug!("{method} {url}");
        match self.send_once(method, &url, &headers, &payload).await {
            Ok(response) => self.classify_response(response).await,
            Err(err) if err.is_timeout() => {
                self.retry_other_variant(method, &url, &headers, &payload)
                    .await
            }
            Err(err) => Err(Error::Transport(err)),
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: &Payload,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.http.request(method.clone(), url).headers(headers.clone());
        request = match payload {
            Payload::Empty => request,
            Payload::Json(value) => request.json(value),
            Payload::Form(fields) => request.form(fields),
        };
        request.send().await
    }

    /// Timeout fallback for accounts provisioned on the other deployment
    /// variant. A community URL is retried once as single and the variant
    /// sticks if that works; a single URL that times out resets the
    /// variant to community and gives up.
    async fn retry_other_variant(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: &Payload,
    ) -> Result<Option<Value>, Error> {
        if url.contains("app/community/") {
            warn!("{method} {url} timed out, retrying against the single variant");
            self.set_deployment_variant(DeploymentVariant::Single);
            let retry_url = url.replace("app/community/", "app/single/");
            return match self.send_once(method, &retry_url, headers, payload).await {
                Ok(response) => self.classify_response(response).await,
                Err(err) if err.is_timeout() => {
                    error!("{method} {retry_url} timed out on both variants");
                    self.set_deployment_variant(DeploymentVariant::Community);
                    Err(Error::Timeout {
                        timeout_secs: self.timeout_secs,
                    })
                }
                Err(err) => Err(Error::Transport(err)),
            };
        }
        if url.contains("app/single/") {
            self.set_deployment_variant(DeploymentVariant::Community);
        }
        error!("{method} {url} timed out");
        Err(Error::Timeout {
            timeout_secs: self.timeout_secs,
        })
    }

    async fn classify_response(&self, response: reqwest::Response) -> Result<Option<Value>, Error> {
        let status = response.status();
        let url = response.url().clone();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: format!("cloud rejected credentials for {url}"),
            });
        }
        let body = response.text().await?;
        if !status.is_success() {
            debug!("HTTP {status} from {url}: {}", preview(&body));
            return Ok(None);
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(extract_payload(&value, url.as_str())),
            Err(err) => {
                error!("unparsable JSON from {url}: {err}");
                Ok(None)
            }
        }
    }
}

/// Strip the cloud's two envelope shapes down to their payload.
///
/// Gateway-style bodies signal success with `result == 0` and wrap data
/// in `datas`; activities-style bodies use `code == 0` and `data`. A
/// non-zero `code` is how the activities endpoints say "nothing for
/// you", which callers need to see as an empty list rather than an
/// error. Anything else is unrecognized and dropped with a log line.
fn extract_payload(value: &Value, url: &str) -> Option<Value> {
    if status_field(value, "result") == Some(0) {
        return Some(value.get("datas").cloned().unwrap_or_else(|| value.clone()));
    }
    match status_field(value, "code") {
        Some(0) => Some(value.get("data").cloned().unwrap_or_else(|| value.clone())),
        Some(code) => {
            debug!("cloud status {code} from {url}, treating as empty result");
            Some(Value::Array(Vec::new()))
        }
        None => {
            warn!("unrecognized response shape from {url}: {}", preview(&value.to_string()));
            None
        }
    }
}

/// Envelope status fields arrive as ints or numeric strings.
fn status_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a normalized payload indicates vendor-side success. The
/// empty-array sentinel stands for a non-zero status code and does not
/// count.
pub(crate) fn envelope_success(payload: Option<&Value>) -> bool {
    match payload {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
        None => false,
    }
}

/// Decode a normalized payload into a typed model.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    payload: Option<Value>,
    endpoint: &str,
) -> Result<T, Error> {
    let Some(value) = payload else {
        return Err(Error::Api {
            message: format!("no usable response from {endpoint}"),
        });
    };
    serde_json::from_value(value.clone()).map_err(|err| Error::Deserialization {
        message: format!("{endpoint}: {err}"),
        body: preview(&value.to_string()).to_owned(),
    })
}

/// First 200 bytes of a body for log lines, clipped to a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_envelope_unwraps_datas() {
        let body = json!({"result": 0, "datas": {"rest_server_https": "a:1"}});
        let payload = extract_payload(&body, "test").expect("payload");
        assert_eq!(payload["rest_server_https"], "a:1");
    }

    #[test]
    fn result_envelope_without_datas_returns_whole_body() {
        let body = json!({"result": 0, "message": "OK"});
        let payload = extract_payload(&body, "test").expect("payload");
        assert_eq!(payload["message"], "OK");
    }

    #[test]
    fn code_envelope_unwraps_data() {
        let body = json!({"code": 0, "data": [{"CaptureTime": "1"}]});
        let payload = extract_payload(&body, "test").expect("payload");
        assert_eq!(payload[0]["CaptureTime"], "1");
    }

    #[test]
    fn nonzero_code_becomes_empty_list() {
        let body = json!({"code": 102, "message": "no records"});
        let payload = extract_payload(&body, "test").expect("payload");
        assert_eq!(payload, json!([]));
    }

    #[test]
    fn string_status_fields_are_accepted() {
        let body = json!({"result": "0", "datas": {"k": "v"}});
        assert!(extract_payload(&body, "test").is_some());
        let body = json!({"code": "7"});
        assert_eq!(extract_payload(&body, "test"), Some(json!([])));
    }

    #[test]
    fn unknown_shape_yields_none() {
        assert!(extract_payload(&json!({"status": "ok"}), "test").is_none());
        assert!(extract_payload(&json!([1, 2]), "test").is_none());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let cut = preview(&body);
        assert!(cut.len() <= 200);
        assert!(body.starts_with(cut));
    }

    #[test]
    fn subdomain_substitution_targets_the_placeholder() {
        let client = CloudClient::new(&TransportConfig::default()).expect("client");
        client.update_session(|s| s.subdomain = "jcloud".into());
        assert_eq!(
            client.apply_subdomain("https://subdomain.akuvox.com/web/app/community/x"),
            "https://jcloud.akuvox.com/web/app/community/x"
        );
        assert_eq!(
            client.apply_subdomain("http://127.0.0.1:9/x"),
            "http://127.0.0.1:9/x"
        );
    }

    #[test]
    fn activities_url_tracks_the_variant() {
        let client = CloudClient::new(&TransportConfig::default()).expect("client");
        assert_eq!(
            client.activities_url("log/getDoorLog"),
            "https://subdomain.akuvox.com/web/app/community/log/getDoorLog"
        );
        client.set_deployment_variant(DeploymentVariant::Single);
        assert_eq!(
            client.activities_url("log/getDoorLog"),
            "https://subdomain.akuvox.com/web/app/single/log/getDoorLog"
        );
    }
}
