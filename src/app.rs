/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (PgPool, TokenService, repos) → Router 組み立て
 * - Middleware の適用 (HTTP 共通 / CORS)。access guard は routes 側
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::repos::product_repo::PgProductRepo;
use crate::repos::user_repo::PgUserRepo;
use crate::services::auth::build_token_service;
use crate::state::AppState;

const DB_MAX_CONNECTIONS: u32 = 10;
const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    // RUST_LOG があればそれを優先
    // 例: RUST_LOG=info,token_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: 即落として気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env().map_err(AppError::from)?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting token-gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, AppError> {
    let db = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to database");
            AppError::Internal
        })?;
    tracing::info!("database connection established");

    // secret が空ならここで起動失敗
    let tokens = build_token_service(config)?;
    let settings = tokens.settings();
    tracing::info!(
        issuer = %settings.issuer,
        ttl_seconds = settings.ttl.num_seconds(),
        refresh_window_seconds = settings.refresh_window.num_seconds(),
        "token service ready"
    );
    let users = Arc::new(PgUserRepo::new(db.clone()));
    let products = Arc::new(PgProductRepo::new(db));

    Ok(AppState::new(tokens, users, products))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    let router = middleware::http::apply(router);
    middleware::cors::apply(router, config)
}
