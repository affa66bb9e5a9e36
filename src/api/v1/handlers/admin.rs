/*
 * Responsibility
 * - GET /admin, /admin/stats, /admin/users (role "admin" の pipeline の後ろ)
 * - 集計の失敗は 0 件として返し、database_status で不調を知らせる
 */
use axum::{Json, extract::State};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Value, json};

use crate::{
    api::v1::extractors::Identity,
    error::AppError,
    repos::{
        product_repo::ProductCounts,
        user_repo::{UserCounts, UserSummary},
    },
    state::AppState,
};

const RECENT_LOGIN_WINDOW_HOURS: i64 = 24;

pub async fn admin(State(state): State<AppState>, Identity(ctx): Identity) -> Json<Value> {
    let users = user_counts(&state).await;
    let products = product_counts(&state).await;

    Json(json!({
        "message": "welcome to the admin area",
        "user": ctx.email(),
        "roles": ctx.roles(),
        "admin_info": {
            "total_users": users.total,
            "total_products": products.total,
            "system_status": "operational",
        },
    }))
}

pub async fn admin_stats(State(state): State<AppState>) -> Json<Value> {
    let users = user_counts(&state).await;
    let products = product_counts(&state).await;

    let database_status = match state.users.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::error!(error = %e, "database health check failed");
            "unhealthy"
        }
    };

    Json(json!({
        "users": users,
        "products": products,
        "system": { "database_status": database_status },
    }))
}

pub async fn admin_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(state.users.list_all().await?))
}

async fn user_counts(state: &AppState) -> UserCounts {
    let since = Utc::now() - ChronoDuration::hours(RECENT_LOGIN_WINDOW_HOURS);
    state.users.count_users(since).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to count users");
        UserCounts::default()
    })
}

async fn product_counts(state: &AppState) -> ProductCounts {
    state.products.count_products().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to count products");
        ProductCounts::default()
    })
}
