use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

use super::IdentityContext;

/// Handler で IdentityContext を受け取るための extractor
///
/// access middleware が request.extensions() に insert 済みである前提。
/// 見つからない場合は guard の掛け忘れ (実装ミス) なので 500 を返す。
pub struct Identity(pub IdentityContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<IdentityContext>() {
            Some(ctx) => Ok(Identity(ctx.clone())),
            None => {
                tracing::error!(
                    path = %parts.uri.path(),
                    "identity context unavailable; route is not behind the access middleware"
                );
                Err(AppError::Internal)
            }
        }
    }
}
