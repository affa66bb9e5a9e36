//! Request guards.
//!
//! Each guard looks at the request headers and the identity produced so far
//! and either lets the request proceed (returning the identity) or rejects it.

use std::sync::Arc;

use axum::http::{HeaderMap, header};

use crate::api::v1::extractors::{IdentityContext, RoleSet};
use crate::middleware::auth::error::AccessError;
use crate::services::auth::TokenService;

pub trait Guard: Send + Sync {
    fn evaluate(
        &self,
        headers: &HeaderMap,
        context: Option<IdentityContext>,
    ) -> Result<IdentityContext, AccessError>;
}

/// Extract the credential from `Authorization: Bearer <token>`.
///
/// The value must be exactly two space-separated parts with a case-sensitive
/// `Bearer` scheme.
pub fn parse_bearer(headers: &HeaderMap) -> Result<&str, AccessError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AccessError::HeaderMissing)?;
    let value = value.to_str().map_err(|_| AccessError::SchemeInvalid)?;

    if value.is_empty() {
        return Err(AccessError::HeaderMissing);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AccessError::SchemeInvalid),
    }
}

/// Validates the bearer token and produces the identity.
#[derive(Clone, Debug)]
pub struct AuthenticationGuard {
    tokens: Arc<TokenService>,
}

impl AuthenticationGuard {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl Guard for AuthenticationGuard {
    fn evaluate(
        &self,
        headers: &HeaderMap,
        _context: Option<IdentityContext>,
    ) -> Result<IdentityContext, AccessError> {
        let token = parse_bearer(headers)?;
        let claims = self.tokens.validate(token)?;
        Ok(IdentityContext::from_claims(&claims))
    }
}

/// Requires one specific role.
#[derive(Clone, Debug)]
pub struct RoleGuard {
    role: String,
}

impl RoleGuard {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl Guard for RoleGuard {
    fn evaluate(
        &self,
        _headers: &HeaderMap,
        context: Option<IdentityContext>,
    ) -> Result<IdentityContext, AccessError> {
        let ctx = context.ok_or(AccessError::ContextUnavailable)?;
        if !ctx.has_role(&self.role) {
            return Err(AccessError::RoleMissing {
                accepted: self.role.clone(),
            });
        }
        Ok(ctx)
    }
}

/// Requires at least one of the accepted roles.
#[derive(Clone, Debug)]
pub struct AnyRoleGuard {
    accepted: RoleSet,
}

impl AnyRoleGuard {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted: RoleSet = roles.into_iter().collect();
        if accepted.is_empty() {
            // 空集合はどのユーザーも通さない
            tracing::warn!("any-role guard configured with no accepted roles");
        }
        Self { accepted }
    }
}

impl Guard for AnyRoleGuard {
    fn evaluate(
        &self,
        _headers: &HeaderMap,
        context: Option<IdentityContext>,
    ) -> Result<IdentityContext, AccessError> {
        let ctx = context.ok_or(AccessError::ContextUnavailable)?;
        if !ctx.has_any_role(&self.accepted) {
            return Err(AccessError::RoleMissing {
                accepted: self.accepted.iter().collect::<Vec<_>>().join(","),
            });
        }
        Ok(ctx)
    }
}
