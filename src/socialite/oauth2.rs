//! # OAuth2 授权码客户端
//!
//! 基于 `oauth2` crate 的授权码流程。会话绑定的驱动使用 CSRF state + PKCE，
//! 无状态驱动只生成授权地址。令牌换取后通过用户信息接口拉取身份，
//! 字段按 JSON Pointer 映射。

use ::oauth2::basic::BasicClient;
use ::oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use async_trait::async_trait;
use reqwest::{Client, redirect};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{
    CallbackRequest, OAuthState, Provider, ProviderError, ProviderRedirect, RedirectResponse,
    SocialUser, Verification,
};
use crate::config::{FieldMapping, OAuth2ProviderConfig};
use crate::error::{LinkError, Result};
use crate::{ldebug, lwarn, logging::{LogComponent, LogStage}};

/// 内置的服务商预设
struct Preset {
    auth_url: &'static str,
    token_url: &'static str,
    userinfo_url: &'static str,
    scopes: &'static [&'static str],
    fields: [Option<&'static str>; 5],
}

const GITHUB: Preset = Preset {
    auth_url: "https://github.com/login/oauth/authorize",
    token_url: "https://github.com/login/oauth/access_token",
    userinfo_url: "https://api.github.com/user",
    scopes: &["read:user", "user:email"],
    fields: [Some("/id"), Some("/email"), Some("/login"), Some("/name"), Some("/avatar_url")],
};

const GOOGLE: Preset = Preset {
    auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo",
    scopes: &["openid", "email", "profile"],
    fields: [Some("/sub"), Some("/email"), None, Some("/name"), Some("/picture")],
};

const GITLAB: Preset = Preset {
    auth_url: "https://gitlab.com/oauth/authorize",
    token_url: "https://gitlab.com/oauth/token",
    userinfo_url: "https://gitlab.com/api/v4/user",
    scopes: &["read_user"],
    fields: [Some("/id"), Some("/email"), Some("/username"), Some("/name"), Some("/avatar_url")],
};

fn preset(name: &str) -> Option<&'static Preset> {
    match name {
        "github" => Some(&GITHUB),
        "google" => Some(&GOOGLE),
        "gitlab" => Some(&GITLAB),
        _ => None,
    }
}

/// 用户信息字段的 JSON Pointer
#[derive(Debug, Clone)]
struct Pointers {
    id: String,
    email: Option<String>,
    nickname: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
}

impl Pointers {
    fn resolve(mapping: &FieldMapping, preset: Option<&Preset>) -> Self {
        let [id, email, nickname, name, avatar] = preset.map_or(
            [Some("/id"), Some("/email"), Some("/nickname"), Some("/name"), Some("/avatar")],
            |p| p.fields,
        );
        let pick = |configured: &Option<String>, fallback: Option<&str>| {
            configured.clone().or_else(|| fallback.map(str::to_string))
        };

        Self {
            id: mapping.id.clone().unwrap_or_else(|| id.unwrap_or("/id").to_string()),
            email: pick(&mapping.email, email),
            nickname: pick(&mapping.nickname, nickname),
            name: pick(&mapping.name, name),
            avatar: pick(&mapping.avatar, avatar),
        }
    }
}

/// 通用 OAuth2 客户端
#[derive(Debug, Clone)]
pub struct OAuth2Provider {
    driver: String,
    client_id: ClientId,
    client_secret: Option<ClientSecret>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    userinfo_url: Url,
    scopes: Vec<String>,
    pointers: Pointers,
    stateless: bool,
    http: Client,
}

impl OAuth2Provider {
    /// 根据配置创建客户端，未填写的端点和字段从预设补全
    pub fn from_config(driver: &str, config: &OAuth2ProviderConfig, stateless: bool) -> Result<Self> {
        let preset = match config.preset.as_deref() {
            Some(name) => Some(preset(name).ok_or_else(|| {
                LinkError::config(format!("驱动 {driver} 使用了未知的预设: {name}"))
            })?),
            None => None,
        };

        let endpoint = |configured: &Option<String>, fallback: Option<&'static str>, field: &str| {
            configured
                .clone()
                .or_else(|| fallback.map(str::to_string))
                .ok_or_else(|| LinkError::config(format!("驱动 {driver} 缺少 {field} 配置")))
        };

        let auth_url = endpoint(&config.auth_url, preset.map(|p| p.auth_url), "auth_url")?;
        let token_url = endpoint(&config.token_url, preset.map(|p| p.token_url), "token_url")?;
        let userinfo_url =
            endpoint(&config.userinfo_url, preset.map(|p| p.userinfo_url), "userinfo_url")?;

        let scopes = config.scopes.clone().unwrap_or_else(|| {
            preset
                .map(|p| p.scopes.iter().map(ToString::to_string).collect())
                .unwrap_or_default()
        });

        // 不跟随重定向，避免授权码被转发到其他地址
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("social-link/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LinkError::config_with_source("无法创建HTTP客户端", e))?;

        Ok(Self {
            driver: driver.to_string(),
            client_id: ClientId::new(config.client_id.clone()),
            client_secret: config.client_secret.clone().map(ClientSecret::new),
            auth_url: AuthUrl::new(auth_url)?,
            token_url: TokenUrl::new(token_url)?,
            redirect_url: RedirectUrl::new(config.redirect_uri.clone())?,
            userinfo_url: Url::parse(&userinfo_url)?,
            scopes,
            pointers: Pointers::resolve(&config.fields, preset),
            stateless,
            http,
        })
    }

    /// 从会话状态和回调参数中确定 PKCE verifier，同时校验 state
    fn verify_state(
        request: &CallbackRequest,
        verification: Verification,
    ) -> std::result::Result<Option<String>, ProviderError> {
        match verification {
            Verification::Stateless => Ok(None),
            Verification::Session(None) => Err(ProviderError::InvalidState),
            Verification::Session(Some(saved)) => {
                let returned = request.get("state").ok_or(ProviderError::InvalidState)?;
                if returned != saved.state {
                    return Err(ProviderError::InvalidState);
                }
                Ok(saved.pkce_verifier)
            }
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<String>,
    ) -> std::result::Result<String, ProviderError> {
        let mut client = BasicClient::new(self.client_id.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(secret.clone());
        }

        let mut request = client.exchange_code(AuthorizationCode::new(code.to_string()));
        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier));
        }

        let token = request.request_async(&self.http).await.map_err(|e| {
            let message = match &e {
                RequestTokenError::ServerResponse(err) => err.to_string(),
                RequestTokenError::Parse(_, body) => format!(
                    "unexpected token response: {}",
                    String::from_utf8_lossy(body)
                ),
                other => format!("{other:?}"),
            };
            lwarn!(
                "system",
                LogStage::Callback,
                LogComponent::OAuth,
                "token_exchange",
                &format!("令牌换取失败: {message}"),
                driver = %self.driver
            );
            ProviderError::TokenExchange(message)
        })?;

        Ok(token.access_token().secret().clone())
    }

    async fn fetch_profile(&self, access_token: &str) -> std::result::Result<Value, ProviderError> {
        let profile = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        Ok(profile)
    }

    fn map_profile(&self, profile: &Value) -> std::result::Result<SocialUser, ProviderError> {
        let field = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .and_then(|p| profile.pointer(p))
                .and_then(scalar_to_string)
        };

        let id = profile
            .pointer(&self.pointers.id)
            .and_then(scalar_to_string)
            .ok_or_else(|| ProviderError::Profile(format!("missing {}", self.pointers.id)))?;

        Ok(SocialUser {
            id,
            email: field(&self.pointers.email),
            nickname: field(&self.pointers.nickname),
            name: field(&self.pointers.name),
            avatar: field(&self.pointers.avatar),
        })
    }
}

/// 字符串和数字字段统一转为字符串，空串视为缺失
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Provider for OAuth2Provider {
    async fn redirect(&self) -> std::result::Result<ProviderRedirect, ProviderError> {
        let client = BasicClient::new(self.client_id.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new));

        if self.stateless {
            let (url, _) = request.url();
            return Ok(ProviderRedirect::new(RedirectResponse::Redirect(url)));
        }

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        request = request.set_pkce_challenge(pkce_challenge);
        let (url, csrf_token) = request.url();

        ldebug!(
            "system",
            LogStage::Redirect,
            LogComponent::OAuth,
            "authorize_url",
            "已生成授权地址",
            driver = %self.driver
        );

        Ok(
            ProviderRedirect::new(RedirectResponse::Redirect(url)).with_state(OAuthState {
                state: csrf_token.secret().clone(),
                pkce_verifier: Some(pkce_verifier.secret().clone()),
            }),
        )
    }

    async fn user(
        &self,
        request: &CallbackRequest,
        verification: Verification,
    ) -> std::result::Result<SocialUser, ProviderError> {
        if let Some(error) = request.get("error") {
            let description = request.get("error_description").unwrap_or(error);
            return Err(ProviderError::Denied(description.to_string()));
        }

        let pkce_verifier = Self::verify_state(request, verification)?;
        let code = request
            .get("code")
            .ok_or_else(|| ProviderError::MissingParameter("code".to_string()))?;

        let access_token = self.exchange_code(code, pkce_verifier).await?;
        let profile = self.fetch_profile(&access_token).await?;

        self.map_profile(&profile)
    }
}
