use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::services::auth::TokenError;

/// Why a guard refused a request.
///
/// Distinct kinds are kept for logs only; the response collapses them to
/// 401 / 403 / 500 without detail.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("authorization header missing")]
    HeaderMissing,

    #[error("authorization header is not `Bearer <token>`")]
    SchemeInvalid,

    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("missing required role (accepted: {accepted})")]
    RoleMissing { accepted: String },

    #[error("identity context unavailable; authentication guard did not run")]
    ContextUnavailable,
}

impl From<AccessError> for AppError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Token(ref inner) if inner.is_internal() => {
                error!(error = %e, "token service failure");
                AppError::Internal
            }
            AccessError::HeaderMissing | AccessError::SchemeInvalid | AccessError::Token(_) => {
                warn!(error = %e, "authentication failed");
                AppError::Unauthorized
            }
            AccessError::RoleMissing { .. } => {
                info!(error = %e, "authorization denied");
                AppError::Forbidden
            }
            AccessError::ContextUnavailable => {
                error!(error = %e, "guard invoked out of order");
                AppError::Internal
            }
        }
    }
}
