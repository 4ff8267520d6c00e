//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod database;
mod manager;
mod socialite;

pub use app_config::{AppConfig, ServerConfig, SessionConfig};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;
pub use socialite::{
    FieldMapping, OAuth2ProviderConfig, ProviderConfig, RedirectKey, RedirectsConfig,
    SocialiteConfig, TelegramProviderConfig,
};

/// 命名路由引用前缀
pub const ROUTE_PREFIX: &str = "route:";
