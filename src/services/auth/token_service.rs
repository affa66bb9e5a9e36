use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tracing::debug;

use crate::services::auth::claims::{Claims, Principal, split_token};
use crate::services::auth::clock::{Clock, SystemClock};
use crate::services::auth::error::TokenError;
use crate::services::auth::jwt::{HmacJwt, SIGNING_ALGORITHM};

pub const DEFAULT_ISSUER: &str = "token-gate";
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;
pub const DEFAULT_REFRESH_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub issuer: String,
    pub ttl: ChronoDuration,
    /// Max age (from `iat`) at which a token may still be refreshed.
    pub refresh_window: ChronoDuration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            ttl: ChronoDuration::seconds(DEFAULT_TTL_SECONDS as i64),
            refresh_window: ChronoDuration::seconds(DEFAULT_REFRESH_WINDOW_SECONDS as i64),
        }
    }
}

/// Stateless issue / validate / refresh of signed tokens.
///
/// Holds only immutable state (the secret and settings), so one instance is
/// shared behind an `Arc` by all requests without locking. Nothing about an
/// issued token is stored: validity comes from the signature and the
/// embedded claims alone. A refreshed token does not revoke its predecessor.
#[derive(Clone)]
pub struct TokenService {
    jwt: HmacJwt,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt", &self.jwt)
            .field("settings", &self.settings)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], settings: TokenSettings) -> Result<Self, TokenError> {
        Ok(Self {
            jwt: HmacJwt::new(secret)?,
            settings,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a token valid from now for `settings.ttl`.
    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        let claims = Claims::for_principal(
            principal,
            self.clock.now(),
            self.settings.ttl,
            &self.settings.issuer,
        );

        debug!(
            user_id = claims.subject_id,
            expires_at = claims.expires_at,
            "Issuing token"
        );

        self.jwt.sign(&claims)
    }

    /// Validate a presented token.
    ///
    /// Checks, in order: structure, algorithm, signature, validity window.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let parts = split_token(token)?;
        if parts.alg != SIGNING_ALGORITHM {
            return Err(TokenError::UnexpectedAlgorithm { alg: parts.alg });
        }

        let claims = self.jwt.verify(token)?;
        claims.check_window(self.clock.now().timestamp())?;

        Ok(claims)
    }

    /// Exchange a still-valid token for a new one with a fresh window.
    ///
    /// - the presented token must pass `validate`
    /// - and must be no older than `settings.refresh_window`
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.validate(token)?;

        let now = self.clock.now();
        if claims.age_seconds(now.timestamp()) > self.settings.refresh_window.num_seconds() {
            debug!(
                user_id = claims.subject_id,
                issued_at = claims.issued_at,
                "Refresh window exceeded"
            );
            return Err(TokenError::RefreshWindowExceeded);
        }

        let renewed = claims.renewed(now, self.settings.ttl, &self.settings.issuer);

        debug!(
            user_id = renewed.subject_id,
            expires_at = renewed.expires_at,
            "Refreshing token"
        );

        self.jwt.sign(&renewed)
    }
}
