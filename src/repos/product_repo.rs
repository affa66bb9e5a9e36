/*
 * Responsibility
 * - products テーブルの読み取り (一覧 / owner 別 / 件数)
 * - 有効 (is_active = true) な行だけを一覧に出す
 */
use std::{future::Future, pin::Pin};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub user_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductCounts {
    pub total: i64,
    pub active: i64,
}

pub trait ProductRepo: Send + Sync {
    /// Active products, newest first.
    fn list_active(&self) -> BoxFuture<'_, RepoResult<Vec<Product>>>;

    /// Active products owned by `user_id`, newest first.
    fn list_by_owner(&self, user_id: i64) -> BoxFuture<'_, RepoResult<Vec<Product>>>;

    fn count_products(&self) -> BoxFuture<'_, RepoResult<ProductCounts>>;
}

#[derive(Clone, Debug)]
pub struct PgProductRepo {
    db: PgPool,
}

impl PgProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl ProductRepo for PgProductRepo {
    fn list_active(&self) -> BoxFuture<'_, RepoResult<Vec<Product>>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, Product>(
                r#"
                SELECT id::BIGINT AS id, name, COALESCE(description, '') AS description,
                       price::FLOAT8 AS price, user_id::BIGINT AS user_id, is_active,
                       created_at, updated_at
                FROM products
                WHERE is_active = true
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(&self.db)
            .await?;

            Ok(rows)
        })
    }

    fn list_by_owner(&self, user_id: i64) -> BoxFuture<'_, RepoResult<Vec<Product>>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, Product>(
                r#"
                SELECT id::BIGINT AS id, name, COALESCE(description, '') AS description,
                       price::FLOAT8 AS price, user_id::BIGINT AS user_id, is_active,
                       created_at, updated_at
                FROM products
                WHERE user_id = $1 AND is_active = true
                ORDER BY created_at DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

            Ok(rows)
        })
    }

    fn count_products(&self) -> BoxFuture<'_, RepoResult<ProductCounts>> {
        Box::pin(async move {
            let counts = sqlx::query_as::<_, ProductCounts>(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE is_active) AS active
                FROM products
                "#,
            )
            .fetch_one(&self.db)
            .await?;

            Ok(counts)
        })
    }
}

#[cfg(test)]
pub use memory::{InMemoryProductRepo, product as test_product};

#[cfg(test)]
mod memory {
    use std::sync::Mutex;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::{BoxFuture, Product, ProductCounts, ProductRepo};
    use crate::repos::error::RepoResult;

    #[derive(Debug, Default)]
    pub struct InMemoryProductRepo {
        products: Mutex<Vec<Product>>,
    }

    impl InMemoryProductRepo {
        pub fn with_product(self, product: Product) -> Self {
            self.products.lock().unwrap().push(product);
            self
        }

        fn active_where(&self, keep: impl Fn(&Product) -> bool) -> Vec<Product> {
            let mut rows: Vec<Product> = self
                .products
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.is_active && keep(p))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows
        }
    }

    /// Product `id` created `id` minutes after a fixed epoch (higher id = newer).
    pub fn product(id: i64, owner: Option<i64>, is_active: bool) -> Product {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + ChronoDuration::minutes(id);
        Product {
            id,
            name: format!("Product {id}"),
            description: String::new(),
            price: 9.5,
            user_id: owner,
            is_active,
            created_at: created,
            updated_at: created,
        }
    }

    impl ProductRepo for InMemoryProductRepo {
        fn list_active(&self) -> BoxFuture<'_, RepoResult<Vec<Product>>> {
            let rows = self.active_where(|_| true);
            Box::pin(async move { Ok(rows) })
        }

        fn list_by_owner(&self, user_id: i64) -> BoxFuture<'_, RepoResult<Vec<Product>>> {
            let rows = self.active_where(|p| p.user_id == Some(user_id));
            Box::pin(async move { Ok(rows) })
        }

        fn count_products(&self) -> BoxFuture<'_, RepoResult<ProductCounts>> {
            let products = self.products.lock().unwrap();
            let counts = ProductCounts {
                total: products.len() as i64,
                active: products.iter().filter(|p| p.is_active).count() as i64,
            };
            Box::pin(async move { Ok(counts) })
        }
    }
}
