//! # 路由配置

use axum::Router;
use axum::routing::{get, post};

use crate::web::AppState;
use crate::web::handlers::{account, socialite, system};

/// 创建全部路由，授权路由挂在 `prefix` 下
pub fn create_routes(state: AppState, prefix: &str) -> Router {
    let prefix = prefix.trim_end_matches('/');

    Router::new()
        .route("/ping", get(system::ping_handler))
        .route("/health", get(system::health_handler))
        .route("/", get(account::home))
        .route("/login", get(account::login))
        .route("/logout", post(account::logout))
        .route("/api/me/social-accounts", get(account::social_accounts))
        .route(
            &format!("{prefix}/{{driver}}/redirect"),
            get(socialite::redirect),
        )
        .route(
            &format!("{prefix}/{{driver}}/callback"),
            get(socialite::callback).post(socialite::callback),
        )
        .with_state(state)
}
