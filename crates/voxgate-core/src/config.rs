// ── Account configuration ────────────────────────────────────────────
//
// These types describe *how* to sign in to a SmartPlus account. They
// carry credential data and tuning knobs, never touch disk, and are
// handed to `Account` at construction; persisted state (subdomain,
// tokens from a previous run) lives in the store instead.

use std::time::Duration;

use secrecy::SecretString;
use voxgate_api::TransportConfig;

use crate::poller::{DOOR_LOG_POLL_INTERVAL, WATCHER_START_GUARD};

/// Sign-in material for a SmartPlus account.
#[derive(Debug, Clone)]
pub enum SignIn {
    /// SMS one-time-code flow. Drive it with
    /// [`Account::request_sms_code`](crate::Account::request_sms_code)
    /// followed by
    /// [`Account::sign_in_with_sms_code`](crate::Account::sign_in_with_sms_code).
    Sms,
    /// Token pair captured from the official mobile app, skipping the
    /// SMS handshake entirely.
    Tokens {
        auth_token: SecretString,
        token: SecretString,
    },
}

/// When to emit a door event whose snapshot image is still uploading.
///
/// The vendor attaches the camera snapshot URL to a door-log entry a
/// few seconds after the entry itself appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ScreenshotPolicy {
    /// Fire as soon as the entry appears, with or without an image.
    #[default]
    Asap,
    /// Hold the event until the snapshot URL is populated.
    Wait,
}

/// Configuration for one SmartPlus account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Pre-resolved tenant REST host, if known. Host resolution is
    /// skipped when this is set; normally left `None` so the gateway
    /// bootstrap decides.
    pub host: Option<String>,
    /// Dialing country code, digits only (for example `"61"`). Picks
    /// the regional cloud subdomain.
    pub country_code: String,
    /// Subscriber phone number as entered by the user.
    pub phone_number: String,
    /// How to authenticate.
    pub sign_in: SignIn,
    /// Prefer configured tokens over ones persisted by a previous run.
    /// Off by default so a re-issued token pair from the cloud is not
    /// clobbered by stale configuration on every restart.
    pub prefer_config_tokens: bool,
    /// Door-event snapshot handling. Always read from live
    /// configuration, never from persisted state.
    pub screenshot_policy: ScreenshotPolicy,
    /// HTTP transport tuning.
    pub transport: TransportConfig,
    /// Door-log poll cadence.
    pub poll_interval: Duration,
    /// A persisted watcher heartbeat younger than this counts as "a
    /// watcher is already running", so starting another is skipped.
    pub poll_start_guard: Duration,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            host: None,
            country_code: String::new(),
            phone_number: String::new(),
            sign_in: SignIn::Sms,
            prefer_config_tokens: false,
            screenshot_policy: ScreenshotPolicy::default(),
            transport: TransportConfig::default(),
            poll_interval: DOOR_LOG_POLL_INTERVAL,
            poll_start_guard: WATCHER_START_GUARD,
        }
    }
}
