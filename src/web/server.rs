//! # HTTP 服务器

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{LinkError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::web::{AppContext, AppState, routes};
use crate::{linfo, lwarn};

/// 社交登录 HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: ServerConfig, context: Arc<AppContext>) -> Self {
        let router = build_router(context);
        Self { config, router }
    }

    /// 绑定端口并开始服务，收到 Ctrl-C 后优雅退出
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self.config.listen_addr().parse().map_err(|e| {
            LinkError::config_with_source(
                format!("无效的监听地址: {}", self.config.listen_addr()),
                e,
            )
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LinkError::internal_with_source(format!("端口绑定失败: {addr}"), e))?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("HTTP 服务已启动: http://{addr}")
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| LinkError::internal_with_source("HTTP 服务异常退出", e))?;

        Ok(())
    }
}

/// 构建带中间件的完整路由
pub fn build_router(context: Arc<AppContext>) -> Router {
    let prefix = context.config.socialite.route_prefix.clone();
    let state = AppState::new(context);

    routes::create_routes(state, &prefix).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CookieManagerLayer::new()),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lwarn!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "signal_error",
            &format!("监听退出信号失败: {e}")
        );
        return;
    }
    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "shutdown_signal",
        "收到退出信号，正在关闭"
    );
}
