/*
 * Responsibility
 * - POST /login, /register, /refresh
 * - credential 照合 → TokenService で token 発行
 * - 失敗理由 (email 不一致 / password 不一致 / 期限切れ) は区別せず 401
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};

use crate::{
    api::v1::dto::auth::{AuthResponse, LoginRequest, RegisterRequest, TokenResponse},
    error::AppError,
    middleware::auth::{AccessError, parse_bearer},
    repos::user_repo::NewUser,
    services::{auth::TokenError, password},
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(req) = body.map_err(invalid_body)?;
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let Some(user) = state.users.find_by_email(&req.email).await? else {
        tracing::info!("login rejected: unknown email");
        return Err(AppError::Unauthorized);
    };

    let hash = user.password_hash.clone();
    let matched = tokio::task::spawn_blocking(move || {
        password::verify_password(&req.password, &hash)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "password verification task failed");
        AppError::Internal
    })?;
    if !matched {
        tracing::info!(user_id = user.id, "login rejected: password mismatch");
        return Err(AppError::Unauthorized);
    }

    let token = state.tokens.issue(&user.principal()).map_err(token_error)?;

    // last_login は失敗しても login 自体は成功させる
    if let Err(e) = state.users.touch_last_login(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "failed to update last login");
    }

    tracing::info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse { token, user }))
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(req) = body.map_err(invalid_body)?;
    req.validate().map_err(AppError::Validation)?;

    let (name, email) = req.normalized();
    if state.users.email_exists(&email).await? {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let plain = req.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing task failed");
            AppError::Internal
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "failed to hash password");
            AppError::Internal
        })?;

    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;

    let token = state.tokens.issue(&user.principal()).map_err(token_error)?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let current = parse_bearer(&headers)?;
    let token = state.tokens.refresh(current).map_err(token_error)?;

    Ok(Json(TokenResponse { token }))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "rejected request body");
    AppError::InvalidRequest("invalid request body".to_string())
}

// 401 (or 500 for signing/secret failures), logged by the AccessError conversion
fn token_error(e: TokenError) -> AppError {
    AccessError::from(e).into()
}
