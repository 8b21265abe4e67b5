//! Session state for one SmartPlus account.
//!
//! A [`Session`] collects everything the endpoint methods need to address
//! the right cluster: resolved REST host, regional subdomain, deployment
//! variant, and the token pair. The client mutates it on every successful
//! login/servers-list response; callers read snapshots of it.

use crate::region::DEFAULT_SUBDOMAIN;

/// Whether a tenant's backend is provisioned under the "single"-unit or
/// "community" (multi-unit) API path prefix.
///
/// Only the activities endpoints (door log, temp keys) are segmented by
/// variant. Accounts on the wrong variant either time out or return empty
/// lists, so the client flips this flag on both signals (see the request
/// wrapper and the door-log fetch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentVariant {
    /// Single-unit deployment (`app/single/` path segment).
    Single,
    /// Multi-unit community deployment (`app/community/` path segment).
    /// The default: most residential accounts live here.
    #[default]
    Community,
}

impl DeploymentVariant {
    /// The URL path segment for this variant.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Community => "community",
        }
    }

    /// The other variant.
    pub fn toggled(self) -> Self {
        match self {
            Self::Single => Self::Community,
            Self::Community => Self::Single,
        }
    }
}

/// Mutable per-account session state.
///
/// `host` and `rtsp_relay_ip` start empty and are filled in by the
/// bootstrap/servers-list responses. An empty string means "not resolved
/// yet" throughout.
#[derive(Debug, Clone)]
pub struct Session {
    /// Tenant REST host (authority form, e.g. `single.ecloud.akuvox.com:8600`).
    pub host: String,
    /// Regional cluster subdomain label.
    pub subdomain: String,
    /// Activities path variant, flipped by the fallback logic.
    pub deployment_variant: DeploymentVariant,
    /// Long-lived account token.
    pub auth_token: String,
    /// Short-lived request token.
    pub token: String,
    /// Subscriber phone number in national format.
    pub phone_number: String,
    /// RTSP relay address used to synthesize camera stream URLs.
    pub rtsp_relay_ip: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            host: String::new(),
            subdomain: DEFAULT_SUBDOMAIN.to_owned(),
            deployment_variant: DeploymentVariant::default(),
            auth_token: String::new(),
            token: String::new(),
            phone_number: String::new(),
            rtsp_relay_ip: String::new(),
        }
    }
}

impl Session {
    /// Whether the tenant REST host has been resolved.
    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }

    /// Whether both tokens are present.
    pub fn has_tokens(&self) -> bool {
        !self.auth_token.is_empty() && !self.token.is_empty()
    }
}

/// Obfuscate a phone number the way the vendor's API contract requires:
/// each digit is replaced by `(digit + 3) mod 10`. Not cryptographic;
/// the cloud reverses it server-side. Non-digit characters pass through
/// unchanged.
pub fn obfuscate_phone_number(phone: &str) -> String {
    phone
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_digit((d + 3) % 10, 10).unwrap_or(c),
            None => c,
        })
        .collect()
}
