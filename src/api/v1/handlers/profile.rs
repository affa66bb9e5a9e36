/*
 * Responsibility
 * - GET /profile: token の subject_id でユーザーを引き直して返す
 * - GET /whoami: IdentityContext をそのまま返す (DB を見ない)
 */
use axum::{Json, extract::State};

use crate::{
    api::v1::extractors::{Identity, IdentityContext},
    error::AppError,
    repos::user_repo::User,
    state::AppState,
};

pub async fn profile(
    State(state): State<AppState>,
    Identity(ctx): Identity,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .find_by_id(ctx.subject_id())
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user))
}

pub async fn whoami(Identity(ctx): Identity) -> Json<IdentityContext> {
    Json(ctx)
}
