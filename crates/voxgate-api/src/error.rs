use thiserror::Error;

/// Top-level error type for the `voxgate-api` crate.
///
/// Covers every failure mode of the SmartPlus cloud surfaces: gateway
/// bootstrap, tenant REST endpoints, and the activities web API.
/// `voxgate-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in rejected or token no longer valid (401-class failures).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value (usually a token) contained bytes HTTP forbids.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Request timed out. The deployment-variant fallback has already
    /// run by the time this surfaces (see the request wrapper).
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Failed to construct the HTTP client.
    #[error("HTTP client build error: {0}")]
    ClientBuild(String),

    // ── Vendor API ──────────────────────────────────────────────────
    /// Unexpected response from the vendor cloud (wrong envelope,
    /// missing payload, non-success status on a required call).
    #[error("SmartPlus API error: {message}")]
    Api { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with a body preview for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for network-level failures (timeouts, connection
    /// errors), the class of errors that may clear up on retry.
    pub fn is_communication(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates the session tokens are no
    /// longer accepted and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
