//! # 社交登录客户端
//!
//! 定义账号绑定流程依赖的第三方授权客户端接口，以及按驱动名注册客户端的管理器。
//! 具体的协议细节（授权码交换、签名校验、用户信息拉取）全部封装在各实现中。

pub mod oauth2;
pub mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::{ProviderConfig, SocialiteConfig};
use crate::error::{LinkError, Result};
use crate::{linfo, logging::{LogComponent, LogStage}};

pub use self::oauth2::OAuth2Provider;
pub use self::telegram::TelegramProvider;

/// 第三方返回的用户身份
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialUser {
    /// 第三方分配的稳定标识
    pub id: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl SocialUser {
    /// 非空邮箱
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }

    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        non_empty(self.nickname.as_deref())
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// 客户端给出的原始跳转结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectResponse {
    /// 跳转到授权地址
    Redirect(Url),
    /// 原样输出的文本（可能是 URL，也可能是 HTML）
    Text(String),
    /// 客户端返回了无法处理的结果
    Other { kind: String },
}

/// 在集成边界归一化后的跳转指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectInstruction {
    Url(String),
    Body(String),
}

impl RedirectInstruction {
    /// 将客户端的原始结果归一化为 URL 跳转或响应体
    pub fn from_response(driver: &str, response: RedirectResponse) -> Result<Self> {
        match response {
            RedirectResponse::Redirect(url) => Ok(Self::Url(url.into())),
            RedirectResponse::Text(text) => match Url::parse(text.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url.into())),
                _ => Ok(Self::Body(text)),
            },
            RedirectResponse::Other { kind } => Err(LinkError::unsupported_response(driver, kind)),
        }
    }
}

/// 会话绑定的授权状态（CSRF state 与 PKCE verifier）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub pkce_verifier: Option<String>,
}

/// `Provider::redirect` 的结果
#[derive(Debug, Clone)]
pub struct ProviderRedirect {
    pub response: RedirectResponse,
    /// 需要写入会话、在回调时校验的状态
    pub state: Option<OAuthState>,
}

impl ProviderRedirect {
    #[must_use]
    pub const fn new(response: RedirectResponse) -> Self {
        Self {
            response,
            state: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: OAuthState) -> Self {
        self.state = Some(state);
        self
    }
}

/// 回调校验方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// 不依赖会话状态
    Stateless,
    /// 使用会话中保存的状态，`None` 表示会话里没有
    Session(Option<OAuthState>),
}

/// 回调请求参数（query 与表单合并后）
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    params: BTreeMap<String, String>,
}

impl CallbackRequest {
    #[must_use]
    pub const fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// 客户端错误，回调流程中会被吸收并转为错误跳转
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("access denied: {0}")]
    Denied(String),

    #[error("invalid state")]
    InvalidState,

    #[error("missing callback parameter: {0}")]
    MissingParameter(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed user profile: {0}")]
    Profile(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("authorization data is outdated")]
    Expired,

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

/// 第三方授权客户端
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// 发起授权，返回跳转结果和需要保存的会话状态
    async fn redirect(&self) -> std::result::Result<ProviderRedirect, ProviderError>;

    /// 处理回调，换取第三方用户身份
    async fn user(
        &self,
        request: &CallbackRequest,
        verification: Verification,
    ) -> std::result::Result<SocialUser, ProviderError>;
}

/// 按驱动名注册的客户端集合
#[derive(Default, Clone)]
pub struct SocialiteManager {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl std::fmt::Debug for SocialiteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialiteManager")
            .field("drivers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SocialiteManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据配置创建全部客户端
    pub fn from_config(config: &SocialiteConfig) -> Result<Self> {
        let mut manager = Self::new();

        for (driver, provider_config) in &config.providers {
            let stateless = config.is_stateless(driver);
            let provider: Arc<dyn Provider> = match provider_config {
                ProviderConfig::OAuth2(cfg) => {
                    Arc::new(OAuth2Provider::from_config(driver, cfg, stateless)?)
                }
                ProviderConfig::Telegram(cfg) => Arc::new(TelegramProvider::from_config(cfg)),
            };
            manager.register(driver.clone(), provider);
        }

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Socialite,
            "providers_ready",
            &format!("已注册 {} 个社交登录客户端", manager.providers.len())
        );

        Ok(manager)
    }

    /// 注册（或替换）驱动的客户端
    pub fn register(&mut self, driver: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(driver.into(), provider);
    }

    #[must_use]
    pub fn driver(&self, driver: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(driver).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_redirect_is_url() {
        let url = Url::parse("https://github.com/login/oauth/authorize?client_id=x").unwrap();
        let instruction =
            RedirectInstruction::from_response("github", RedirectResponse::Redirect(url)).unwrap();
        assert_eq!(
            instruction,
            RedirectInstruction::Url("https://github.com/login/oauth/authorize?client_id=x".into())
        );
    }

    #[test]
    fn test_text_url_becomes_redirect() {
        let instruction = RedirectInstruction::from_response(
            "custom",
            RedirectResponse::Text("https://example.com/authorize".into()),
        )
        .unwrap();
        assert_eq!(
            instruction,
            RedirectInstruction::Url("https://example.com/authorize".into())
        );
    }

    #[test]
    fn test_text_body_is_kept() {
        let html = "<script async src=\"https://telegram.org/js/telegram-widget.js\"></script>";
        let instruction =
            RedirectInstruction::from_response("telegram", RedirectResponse::Text(html.into()))
                .unwrap();
        assert_eq!(instruction, RedirectInstruction::Body(html.into()));
    }

    #[test]
    fn test_other_shape_is_unsupported() {
        let err = RedirectInstruction::from_response(
            "weird",
            RedirectResponse::Other {
                kind: "json object".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedResponse { ref driver, .. } if driver == "weird"));
    }

    #[test]
    fn test_social_user_blank_fields() {
        let user = SocialUser {
            id: "1".into(),
            email: Some(String::new()),
            nickname: Some("  ".into()),
            name: Some("Ada".into()),
            avatar: None,
        };
        assert_eq!(user.email(), None);
        // 只有空字符串算空，空白保持原样
        assert_eq!(user.nickname(), Some("  "));
        assert_eq!(user.name(), Some("Ada"));
    }

    #[test]
    fn test_manager_lookup() {
        let mut manager = SocialiteManager::new();
        manager.register("github", Arc::new(MockProvider::new()));

        assert!(manager.driver("github").is_some());
        assert!(manager.driver("gitlab").is_none());
    }
}
