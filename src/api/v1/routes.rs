/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 公開: /health, /login, /register, /refresh
 * - 認証必須: /profile, /whoami, /products, /my-products
 * - admin role 必須: /admin, /admin/stats, /admin/users
 * - guard の掛け方 (AccessPipeline + route_layer) もここで決める
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    admin::{admin, admin_stats, admin_users},
    auth::{login, refresh, register},
    health::health,
    products::{list_products, my_products},
    profile::{profile, whoami},
};
use crate::middleware::auth::{AccessPipeline, access};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh));

    let authenticated = access::apply(
        Router::new()
            .route("/profile", get(profile))
            .route("/whoami", get(whoami))
            .route("/products", get(list_products))
            .route("/my-products", get(my_products)),
        AccessPipeline::authenticated(state.tokens.clone()),
    );

    let admin_only = access::apply(
        Router::new()
            .route("/admin", get(admin))
            .route("/admin/stats", get(admin_stats))
            .route("/admin/users", get(admin_users)),
        AccessPipeline::authenticated(state.tokens.clone()).require_role("admin"),
    );

    public.merge(authenticated).merge(admin_only)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::repos::product_repo::{InMemoryProductRepo, test_product};
    use crate::repos::user_repo::{InMemoryUserRepo, test_user};
    use crate::services::auth::token_service::test_support::{service_at, t0};
    use crate::services::password::hash_password;

    const PASSWORD: &str = "Sup3rSecret";

    struct Harness {
        app: Router,
        repo: Arc<InMemoryUserRepo>,
    }

    fn harness() -> Harness {
        let hash = hash_password(PASSWORD).unwrap();
        let repo = Arc::new(
            InMemoryUserRepo::default()
                .with_user(test_user(1, "alice@example.com", &hash, &["user"]))
                .with_user(test_user(2, "root@example.com", &hash, &["admin", "user"])),
        );
        let products = Arc::new(
            InMemoryProductRepo::default()
                .with_product(test_product(1, Some(1), true))
                .with_product(test_product(2, Some(2), true))
                .with_product(test_product(3, Some(1), true))
                .with_product(test_product(4, Some(1), false))
                .with_product(test_product(5, None, true)),
        );
        let state = AppState::new(Arc::new(service_at(t0()).0), repo.clone(), products);
        let app = routes(&state).with_state(state);
        Harness { app, repo }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn login_as(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = harness();
        let (status, body) = send(&h.app, Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn login_returns_token_and_user() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": PASSWORD })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().unwrap().split('.').count() == 3);
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert!(body["user"].get("password_hash").is_none());
        assert!(h.repo.get(1).unwrap().last_login.is_some());
    }

    #[tokio::test]
    async fn login_failures() {
        let h = harness();

        let (status, _) = send(
            &h.app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "Wrong1Pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &h.app,
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&h.app, Method::POST, "/login", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, _) = send(&h.app, Method::POST, "/login", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_creates_user_with_default_role() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/register",
            None,
            Some(json!({ "name": "Bob", "email": "Bob@Example.com", "password": PASSWORD })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["user"]["email"], "bob@example.com");
        assert_eq!(body["user"]["roles"], json!(["user"]));

        let token = body["token"].as_str().unwrap();
        let (status, me) = send(&h.app, Method::GET, "/whoami", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "bob@example.com");
    }

    #[tokio::test]
    async fn register_rejections() {
        let h = harness();

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/register",
            None,
            Some(json!({ "name": "B", "email": "bad", "password": "weak" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);

        let (status, _) = send(
            &h.app,
            Method::POST,
            "/register",
            None,
            Some(json!({ "name": "Alice", "email": "alice@example.com", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn profile_and_whoami_need_a_token() {
        let h = harness();

        let (status, _) = send(&h.app, Method::GET, "/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login_as(&h.app, "alice@example.com").await;

        let (status, body) = send(&h.app, Method::GET, "/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "User 1");

        let (status, body) = send(&h.app, Method::GET, "/whoami", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "subject_id": 1, "email": "alice@example.com", "roles": ["user"] })
        );
    }

    #[tokio::test]
    async fn admin_requires_admin_role() {
        let h = harness();

        let user_token = login_as(&h.app, "alice@example.com").await;
        let (status, body) = send(&h.app, Method::GET, "/admin", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let admin_token = login_as(&h.app, "root@example.com").await;
        let (status, body) = send(&h.app, Method::GET, "/admin", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"], "root@example.com");
        assert_eq!(body["roles"], json!(["admin", "user"]));
        assert_eq!(body["admin_info"]["total_users"], 2);
        assert_eq!(body["admin_info"]["total_products"], 5);
        assert_eq!(body["admin_info"]["system_status"], "operational");

        let (status, _) = send(&h.app, Method::GET, "/admin", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_issues_a_usable_token() {
        let h = harness();
        let token = login_as(&h.app, "alice@example.com").await;

        let (status, body) = send(&h.app, Method::POST, "/refresh", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let refreshed = body["token"].as_str().unwrap();
        let (status, _) = send(&h.app, Method::GET, "/whoami", Some(refreshed), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_rejects_bad_credentials() {
        let h = harness();

        let (status, _) = send(&h.app, Method::POST, "/refresh", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&h.app, Method::POST, "/refresh", Some("not.a.jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "unauthorized");
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_not_found() {
        let h = harness();
        let token = login_as(&h.app, "alice@example.com").await;

        // same secret and clock, but a repo without user 1
        let state = AppState::new(
            Arc::new(service_at(t0()).0),
            Arc::new(InMemoryUserRepo::default()),
            Arc::new(InMemoryProductRepo::default()),
        );
        let app = routes(&state).with_state(state);

        let (status, _) = send(&app, Method::GET, "/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_stats_and_users_are_admin_only() {
        let h = harness();

        let user_token = login_as(&h.app, "alice@example.com").await;
        for uri in ["/admin/stats", "/admin/users"] {
            let (status, _) = send(&h.app, Method::GET, uri, Some(&user_token), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");

            let (status, _) = send(&h.app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }

        let admin_token = login_as(&h.app, "root@example.com").await;

        let (status, body) =
            send(&h.app, Method::GET, "/admin/stats", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["users"],
            json!({ "total": 2, "active": 2, "verified": 2, "recent_logins": 2 })
        );
        assert_eq!(body["products"], json!({ "total": 5, "active": 4 }));
        assert_eq!(body["system"]["database_status"], "healthy");

        let (status, body) =
            send(&h.app, Method::GET, "/admin/users", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        for user in users {
            for key in ["id", "name", "email", "email_verified", "is_active", "created_at", "last_login"] {
                assert!(user.get(key).is_some(), "missing {key}");
            }
            assert!(user.get("password_hash").is_none());
        }
    }

    #[tokio::test]
    async fn products_need_a_token() {
        let h = harness();

        for uri in ["/products", "/my-products"] {
            let (status, _) = send(&h.app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }

        let token = login_as(&h.app, "alice@example.com").await;

        let (status, body) = send(&h.app, Method::GET, "/products", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        // active only, newest first
        assert_eq!(ids, vec![5, 3, 2, 1]);

        let (status, body) = send(&h.app, Method::GET, "/my-products", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(body[0]["user_id"], 1);
    }
}
