use thiserror::Error;

/// Failures of token issuance, validation and refresh.
///
/// The kinds are for logs/diagnostics. On the wire every one of them becomes
/// the same 401 (see `AccessError`), except `Signing` and `EmptySecret` which
/// are server-side defects.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("unexpected signing algorithm: {alg}")]
    UnexpectedAlgorithm { alg: String },

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token is too old to refresh")]
    RefreshWindowExceeded,

    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// Server-side failures (not the caller's credential).
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::EmptySecret | Self::Signing(_))
    }
}
