/*
 * Responsibility
 * - GET /products: 有効な product 一覧 (認証必須)
 * - GET /my-products: token の subject_id が owner の product
 */
use axum::{Json, extract::State};

use crate::{
    api::v1::extractors::Identity,
    error::AppError,
    repos::product_repo::Product,
    state::AppState,
};

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list_active().await?))
}

pub async fn my_products(
    State(state): State<AppState>,
    Identity(ctx): Identity,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list_by_owner(ctx.subject_id()).await?))
}
