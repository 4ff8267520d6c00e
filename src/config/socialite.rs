//! # 社交登录配置
//!
//! 驱动允许列表、无状态驱动、跳转目标以及各驱动的客户端定义

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{LinkError, Result};

/// 跳转目标的配置键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectKey {
    AfterLogin,
    AfterBind,
    OnError,
}

impl RedirectKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AfterLogin => "after_login",
            Self::AfterBind => "after_bind",
            Self::OnError => "on_error",
        }
    }
}

impl fmt::Display for RedirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 登录/绑定/失败之后的跳转目标
///
/// 以 `route:` 开头的值按命名路由解析，其余按字面路径或 URL 处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectsConfig {
    #[serde(default = "default_target")]
    pub after_login: String,
    #[serde(default = "default_target")]
    pub after_bind: String,
    #[serde(default = "default_on_error")]
    pub on_error: String,
}

fn default_target() -> String {
    "/".to_string()
}

fn default_on_error() -> String {
    "route:login".to_string()
}

impl Default for RedirectsConfig {
    fn default() -> Self {
        Self {
            after_login: default_target(),
            after_bind: default_target(),
            on_error: default_on_error(),
        }
    }
}

impl RedirectsConfig {
    #[must_use]
    pub fn get(&self, key: RedirectKey) -> &str {
        match key {
            RedirectKey::AfterLogin => &self.after_login,
            RedirectKey::AfterBind => &self.after_bind,
            RedirectKey::OnError => &self.on_error,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (RedirectKey, &str)> {
        [RedirectKey::AfterLogin, RedirectKey::AfterBind, RedirectKey::OnError]
            .into_iter()
            .map(move |key| (key, self.get(key)))
    }
}

/// 社交登录主配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialiteConfig {
    /// 驱动允许列表，值是展示用的图标/标签，只看键是否存在
    #[serde(default)]
    pub drivers: BTreeMap<String, String>,
    /// 回调时不校验会话状态的驱动
    #[serde(default)]
    pub stateless_drivers: HashMap<String, bool>,
    #[serde(default)]
    pub redirects: RedirectsConfig,
    /// 需要同步展示名的驱动及其兜底文案
    #[serde(default = "default_display_name_fallbacks")]
    pub display_name_fallbacks: HashMap<String, String>,
    /// 路由前缀，默认 `/auth`
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// 新建用户占位密码的 bcrypt cost
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
    /// 各驱动的 OAuth 客户端定义
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_display_name_fallbacks() -> HashMap<String, String> {
    HashMap::from([("telegram".to_string(), "Telegram user".to_string())])
}

fn default_route_prefix() -> String {
    "/auth".to_string()
}

const fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Default for SocialiteConfig {
    fn default() -> Self {
        Self {
            drivers: BTreeMap::new(),
            stateless_drivers: HashMap::new(),
            redirects: RedirectsConfig::default(),
            display_name_fallbacks: default_display_name_fallbacks(),
            route_prefix: default_route_prefix(),
            password_hash_cost: default_password_hash_cost(),
            providers: HashMap::new(),
        }
    }
}

impl SocialiteConfig {
    /// 驱动是否在允许列表中
    #[must_use]
    pub fn is_configured(&self, driver: &str) -> bool {
        self.drivers.contains_key(driver)
    }

    #[must_use]
    pub fn is_stateless(&self, driver: &str) -> bool {
        self.stateless_drivers.get(driver).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn redirect_target(&self, key: RedirectKey) -> &str {
        self.redirects.get(key)
    }

    #[must_use]
    pub fn display_name_fallback(&self, driver: &str) -> Option<&str> {
        self.display_name_fallbacks.get(driver).map(String::as_str)
    }

    /// 验证社交登录配置
    pub fn validate(&self) -> Result<()> {
        for (key, target) in self.redirects.entries() {
            if target.trim().is_empty() {
                return Err(LinkError::config(format!("redirects.{key} 不能为空")));
            }
        }

        if !(4..=31).contains(&self.password_hash_cost) {
            return Err(LinkError::config(format!(
                "password_hash_cost 必须在 4..=31 之间: {}",
                self.password_hash_cost
            )));
        }

        if !self.route_prefix.starts_with('/') {
            return Err(LinkError::config(format!(
                "route_prefix 必须以 / 开头: {}",
                self.route_prefix
            )));
        }

        for driver in self.providers.keys() {
            if !self.is_configured(driver) {
                return Err(LinkError::config(format!(
                    "驱动 {driver} 定义了客户端但不在 drivers 允许列表中"
                )));
            }
        }

        Ok(())
    }
}

/// 单个驱动的客户端定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProviderConfig {
    /// 标准 OAuth2 授权码流程
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2ProviderConfig),
    /// Telegram 登录组件
    #[serde(rename = "telegram")]
    Telegram(TelegramProviderConfig),
}

/// OAuth2 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ProviderConfig {
    /// 预设：`github`、`google`、`gitlab`，未设置的端点/字段从预设补全
    #[serde(default)]
    pub preset: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub userinfo_url: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// 用户信息字段映射（JSON Pointer）
    #[serde(default)]
    pub fields: FieldMapping,
    /// HTTP 超时（秒）
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

const fn default_provider_timeout() -> u64 {
    10
}

/// 用户信息 JSON 到 `SocialUser` 的字段映射，值为 JSON Pointer（如 `/data/id`）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Telegram 登录组件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramProviderConfig {
    pub bot_token: String,
    pub bot_username: String,
    pub redirect_uri: String,
    /// `auth_date` 最大允许时长（秒）
    #[serde(default = "default_telegram_max_age")]
    pub max_age_secs: u64,
}

const fn default_telegram_max_age() -> u64 {
    86_400
}
