//! # 系统接口

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::web::{AppState, response};

/// Ping 处理器
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// 健康检查：数据库可达时返回已配置的驱动列表
pub async fn health_handler(State(state): State<AppState>) -> Response {
    if let Err(e) = state.db.ping().await {
        return response::error(
            StatusCode::SERVICE_UNAVAILABLE,
            "DATABASE_UNAVAILABLE",
            &e.to_string(),
        );
    }

    let drivers: Vec<&String> = state.config.socialite.drivers.keys().collect();
    response::success(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "drivers": drivers,
    }))
}
