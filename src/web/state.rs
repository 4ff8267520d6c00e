//! # 应用状态

use sea_orm::DatabaseConnection;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::linker::AccountLinker;
use crate::session::SessionStore;

/// 处理器共享的运行时上下文
#[derive(Debug)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub linker: AccountLinker,
    pub sessions: SessionStore,
    pub db: DatabaseConnection,
}

/// axum 状态，克隆成本只有一次引用计数
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}
