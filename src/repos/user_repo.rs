/*
 * Responsibility
 * - users / roles / user_roles テーブル向け SQLx 操作
 * - login / register / profile が使う principal lookup (UserRepo trait)
 * - admin 向けの集計と一覧 (count_users / list_all / ping)
 * - DB エラーは RepoError に変換して返す
 *
 * Notes
 * - token の発行・検証はここに依存しない。token は DB に保存しない
 */
use std::{future::Future, pin::Pin};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoResult;
use crate::services::auth::Principal;

pub const DEFAULT_ROLE: &str = "user";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email_verified: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// Admin listing row (no password hash, no roles).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub verified: i64,
    pub recent_logins: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Principal lookup used by the login / register / profile handlers.
pub trait UserRepo: Send + Sync {
    /// Active user by email, with roles.
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, RepoResult<Option<User>>>;

    /// Active user by id, with roles.
    fn find_by_id(&self, id: i64) -> BoxFuture<'_, RepoResult<Option<User>>>;

    fn email_exists<'a>(&'a self, email: &'a str) -> BoxFuture<'a, RepoResult<bool>>;

    /// Insert the user and grant `DEFAULT_ROLE` in one transaction.
    fn create(&self, new_user: NewUser) -> BoxFuture<'_, RepoResult<User>>;

    fn touch_last_login(&self, id: i64) -> BoxFuture<'_, RepoResult<()>>;

    /// Counts over all users; `recent_logins` is last_login after `since`.
    fn count_users(&self, since: DateTime<Utc>) -> BoxFuture<'_, RepoResult<UserCounts>>;

    /// Every user, newest first (inactive included).
    fn list_all(&self) -> BoxFuture<'_, RepoResult<Vec<UserSummary>>>;

    fn ping(&self) -> BoxFuture<'_, RepoResult<()>>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    email_verified: bool,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, roles: Vec<String>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            email_verified: self.email_verified,
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
            roles,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn roles_of(&self, user_id: i64) -> RepoResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn with_roles(&self, row: Option<UserRow>) -> RepoResult<Option<User>> {
        match row {
            Some(row) => {
                let roles = self.roles_of(row.id).await?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }
}

impl UserRepo for PgUserRepo {
    fn find_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, RepoResult<Option<User>>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, UserRow>(
                r#"
                SELECT u.id::BIGINT AS id, u.name, u.email, u.password_hash, u.email_verified,
                       u.is_active, u.last_login, u.created_at, u.updated_at
                FROM users u
                WHERE u.email = $1 AND u.is_active = true
                "#,
            )
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

            self.with_roles(row).await
        })
    }

    fn find_by_id(&self, id: i64) -> BoxFuture<'_, RepoResult<Option<User>>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, UserRow>(
                r#"
                SELECT u.id::BIGINT AS id, u.name, u.email, u.password_hash, u.email_verified,
                       u.is_active, u.last_login, u.created_at, u.updated_at
                FROM users u
                WHERE u.id = $1 AND u.is_active = true
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

            self.with_roles(row).await
        })
    }

    fn email_exists<'a>(&'a self, email: &'a str) -> BoxFuture<'a, RepoResult<bool>> {
        Box::pin(async move {
            let exists = sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#,
            )
            .bind(email)
            .fetch_one(&self.db)
            .await?;

            Ok(exists)
        })
    }

    fn create(&self, new_user: NewUser) -> BoxFuture<'_, RepoResult<User>> {
        Box::pin(async move {
            let mut tx = self.db.begin().await?;

            let row = sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (name, email, password_hash, email_verified, is_active)
                VALUES ($1, $2, $3, false, true)
                RETURNING id::BIGINT AS id, name, email, password_hash, email_verified,
                          is_active, last_login, created_at, updated_at
                "#,
            )
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id FROM roles WHERE name = $2
                "#,
            )
            .bind(row.id)
            .bind(DEFAULT_ROLE)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(row.into_user(vec![DEFAULT_ROLE.to_string()]))
        })
    }

    fn touch_last_login(&self, id: i64) -> BoxFuture<'_, RepoResult<()>> {
        Box::pin(async move {
            sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok(())
        })
    }
    fn count_users(&self, since: DateTime<Utc>) -> BoxFuture<'_, RepoResult<UserCounts>> {
        Box::pin(async move {
            let counts = sqlx::query_as::<_, UserCounts>(
                r#"
                SELECT COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE is_active) AS active,
                       COUNT(*) FILTER (WHERE email_verified) AS verified,
                       COUNT(*) FILTER (WHERE last_login > $1) AS recent_logins
                FROM users
                "#,
            )
            .bind(since)
            .fetch_one(&self.db)
            .await?;

            Ok(counts)
        })
    }

    fn list_all(&self) -> BoxFuture<'_, RepoResult<Vec<UserSummary>>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, UserSummary>(
                r#"
                SELECT id::BIGINT AS id, name, email, email_verified, is_active,
                       created_at, last_login
                FROM users
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(&self.db)
            .await?;

            Ok(rows)
        })
    }

    fn ping(&self) -> BoxFuture<'_, RepoResult<()>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.db).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
pub use memory::InMemoryUserRepo;


#[cfg(test)]
pub use memory::user as test_user;
