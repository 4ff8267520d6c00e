//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{DatabaseConfig, SocialiteConfig};
use crate::ensure_config;
use crate::error::Result;

/// 应用主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 会话配置
    #[serde(default)]
    pub session: SessionConfig,
    /// 社交登录配置
    #[serde(default)]
    pub socialite: SocialiteConfig,
    /// 命名路由表（`route:<name>` 解析目标）
    #[serde(default = "default_routes")]
    pub routes: HashMap<String, String>,
}

fn default_routes() -> HashMap<String, String> {
    HashMap::from([
        ("login".to_string(), "/login".to_string()),
        ("home".to_string(), "/".to_string()),
    ])
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
    /// 日志级别（未设置 `RUST_LOG` 时生效）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            log_level: None,
        }
    }
}

impl ServerConfig {
    /// 监听地址字符串，形如 `127.0.0.1:8080`
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 会话 Cookie 名称
    pub cookie_name: String,
    /// 空闲超时（秒）
    pub idle_timeout_secs: u64,
    /// 最大会话数量
    pub max_sessions: u64,
    /// 是否只在 HTTPS 下发送 Cookie
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "social_link_session".to_string(),
            idle_timeout_secs: 7200,
            max_sessions: 10_000,
            secure_cookie: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            socialite: SocialiteConfig::default(),
            routes: default_routes(),
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.server.port != 0, "服务器端口不能为0");
        ensure_config!(!self.database.url.is_empty(), "数据库URL不能为空");
        ensure_config!(self.database.max_connections > 0, "数据库最大连接数必须大于0");
        ensure_config!(!self.session.cookie_name.is_empty(), "会话Cookie名称不能为空");
        ensure_config!(self.session.max_sessions > 0, "最大会话数量必须大于0");

        self.socialite.validate()?;

        for (key, target) in self.socialite.redirects.entries() {
            if let Some(name) = target.strip_prefix(super::ROUTE_PREFIX) {
                ensure_config!(
                    self.routes.contains_key(name),
                    "重定向目标 redirects.{} 引用了未定义的路由: {}",
                    key,
                    name
                );
            }
        }

        Ok(())
    }
}
