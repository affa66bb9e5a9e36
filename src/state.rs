/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - tokens: TokenService (不変。lock 不要で全リクエストから共有)
 *   - users: principal lookup (DB 側の pool/lock は repo の責務)
 *   - products: /products, /my-products と admin 集計用
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::repos::product_repo::ProductRepo;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserRepo>,
    pub products: Arc<dyn ProductRepo>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserRepo>,
        products: Arc<dyn ProductRepo>,
    ) -> Self {
        Self {
            tokens,
            users,
            products,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State with a fixed-clock token service and empty in-memory repos.
    pub fn for_tests() -> Self {
        use crate::repos::product_repo::InMemoryProductRepo;
        use crate::repos::user_repo::InMemoryUserRepo;
        use crate::services::auth::token_service::test_support::{service_at, t0};

        Self::new(
            Arc::new(service_at(t0()).0),
            Arc::new(InMemoryUserRepo::default()),
            Arc::new(InMemoryProductRepo::default()),
        )
    }
}
