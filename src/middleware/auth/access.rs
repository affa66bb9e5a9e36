//! access token 検証 → 認可チェック → IdentityContext を extensions に入れる
//!
//! - guard は AccessPipeline に順番に並べて評価する
//! - pipeline は必ず AuthenticationGuard から始まる (authenticated() でしか作れない)
//! - role guard は認証 guard の後ろに require_role / require_any_role で積む
//! - 成功時のみ handler を呼ぶ。失敗時は 401 / 403 / 500 を返し handler は呼ばない

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::IdentityContext;
use crate::error::AppError;
use crate::middleware::auth::error::AccessError;
use crate::middleware::auth::guards::{AnyRoleGuard, AuthenticationGuard, Guard, RoleGuard};
use crate::services::auth::TokenService;
use crate::state::AppState;

/// Ordered list of guards wrapped around a protected route.
#[derive(Clone)]
pub struct AccessPipeline {
    guards: Vec<Arc<dyn Guard>>,
}

impl std::fmt::Debug for AccessPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPipeline")
            .field("guards", &self.guards.len())
            .finish()
    }
}

impl AccessPipeline {
    pub fn authenticated(tokens: Arc<TokenService>) -> Self {
        Self {
            guards: vec![Arc::new(AuthenticationGuard::new(tokens))],
        }
    }

    pub fn require_role(mut self, role: impl Into<String>) -> Self {
        self.guards.push(Arc::new(RoleGuard::new(role)));
        self
    }

    pub fn require_any_role<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guards.push(Arc::new(AnyRoleGuard::new(roles)));
        self
    }

    /// Run every guard in order; the first rejection wins.
    pub fn evaluate(&self, headers: &HeaderMap) -> Result<IdentityContext, AccessError> {
        let mut context = None;
        for guard in &self.guards {
            context = Some(guard.evaluate(headers, context)?);
        }
        context.ok_or(AccessError::ContextUnavailable)
    }
}

/// Protect every route of `router` with `pipeline`.
///
/// 例：
/// ```ignore
/// let admin = Router::new().route("/admin", get(admin));
/// let admin = middleware::auth::access::apply(
///     admin,
///     AccessPipeline::authenticated(state.tokens.clone()).require_role("admin"),
/// );
/// ```
pub fn apply(router: Router<AppState>, pipeline: AccessPipeline) -> Router<AppState> {
    // route_layer: 未マッチの path には guard を掛けない (404 のまま)
    router.route_layer(middleware::from_fn_with_state(pipeline, access_middleware))
}

async fn access_middleware(
    State(pipeline): State<AccessPipeline>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = pipeline.evaluate(req.headers())?;

    tracing::debug!(
        user_id = identity.subject_id(),
        roles = identity.roles().len(),
        "request authenticated"
    );

    // middleware → extractor への受け渡し (このリクエストの間だけ有効)
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
