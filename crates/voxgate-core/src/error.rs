// ── Core error types ─────────────────────────────────────────────────
//
// User-facing failures from account orchestration. Raw transport
// errors from `voxgate-api` are translated here into a small taxonomy
// the embedding application can branch on: communication problems
// (retryable), authentication problems (re-run the sign-in flow), and
// everything else.

use thiserror::Error;
use voxgate_api::Error as ApiError;

use crate::store::StoreError;

/// Top-level error type for the `voxgate-core` crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Communication ───────────────────────────────────────────────
    /// The cloud could not be reached (DNS, refused connection, etc.)
    #[error("Cannot reach the SmartPlus cloud: {reason}")]
    ConnectionFailed { reason: String },

    /// A cloud request timed out.
    #[error("SmartPlus cloud request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in was rejected or the stored tokens are no longer valid.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Vendor API ──────────────────────────────────────────────────
    /// The cloud answered but not with what was asked for.
    #[error("SmartPlus API error: {message}")]
    Api { message: String },

    /// A door command named a relay the account does not have.
    #[error("No door relay named {name:?} on this account")]
    RelayNotFound { name: String },

    // ── Local ───────────────────────────────────────────────────────
    /// The persistent account store could not be read or written.
    #[error("Account store error: {0}")]
    Store(#[from] StoreError),

    /// A configured value was unusable (bad URL, bad header bytes).
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for network-level failures that may clear up on
    /// retry without any reconfiguration.
    pub fn is_communication(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    /// Returns `true` when the account needs to go back through the
    /// sign-in flow.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } => Self::AuthenticationFailed { message },
            ApiError::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            ApiError::Transport(e) => {
                if e.is_timeout() || e.is_connect() {
                    Self::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                    }
                }
            }
            ApiError::InvalidUrl(e) => Self::Config {
                message: format!("invalid URL: {e}"),
            },
            ApiError::InvalidHeader(e) => Self::Config {
                message: format!("value not usable in an HTTP header: {e}"),
            },
            ApiError::ClientBuild(message) => Self::Config { message },
            ApiError::Api { message } => Self::Api { message },
            ApiError::Deserialization { message, .. } => Self::Api { message },
        }
    }
}
