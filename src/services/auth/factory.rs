//! Factory: build `TokenService` from application `Config`.
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tracing::error;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::{TokenService, TokenSettings};

pub fn build_token_service(config: &Config) -> Result<Arc<TokenService>, AppError> {
    let settings = TokenSettings {
        issuer: config.auth_issuer.clone(),
        ttl: duration("ACCESS_TOKEN_TTL_SECONDS", config.access_token_ttl_seconds)?,
        refresh_window: duration("REFRESH_WINDOW_SECONDS", config.refresh_window_seconds)?,
    };

    let tokens = TokenService::new(config.jwt_secret.as_bytes(), settings).map_err(|e| {
        error!(error = %e, "failed to build token service");
        AppError::Internal
    })?;

    Ok(Arc::new(tokens))
}

fn duration(key: &'static str, seconds: u64) -> Result<ChronoDuration, AppError> {
    i64::try_from(seconds)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .ok_or_else(|| {
            error!(key, seconds, "token duration out of range");
            AppError::Internal
        })
}
