//! # Telegram 登录组件
//!
//! 跳转阶段输出登录组件的 HTML，回调时校验 Telegram 的签名：
//! 以 SHA-256(bot_token) 为密钥，对除 `hash` 外按键排序的 `key=value` 行做 HMAC-SHA256。

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::{
    CallbackRequest, Provider, ProviderError, ProviderRedirect, RedirectResponse, SocialUser,
    Verification,
};
use crate::config::TelegramProviderConfig;

type HmacSha256 = Hmac<Sha256>;

const WIDGET_SCRIPT: &str = "https://telegram.org/js/telegram-widget.js?22";

/// Telegram 登录客户端
#[derive(Debug, Clone)]
pub struct TelegramProvider {
    bot_token: String,
    bot_username: String,
    redirect_uri: String,
    max_age_secs: i64,
}

impl TelegramProvider {
    #[must_use]
    pub fn from_config(config: &TelegramProviderConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            bot_username: config.bot_username.clone(),
            redirect_uri: config.redirect_uri.clone(),
            max_age_secs: i64::try_from(config.max_age_secs).unwrap_or(i64::MAX),
        }
    }

    fn widget_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html><body>\n<script async src=\"{WIDGET_SCRIPT}\" \
             data-telegram-login=\"{}\" data-size=\"large\" data-auth-url=\"{}\" \
             data-request-access=\"write\"></script>\n</body></html>\n",
            escape_attr(&self.bot_username),
            escape_attr(&self.redirect_uri),
        )
    }

    /// 待签名字符串：除 `hash` 外的参数按键排序，以 `\n` 连接
    fn data_check_string(request: &CallbackRequest) -> String {
        request
            .params()
            .iter()
            .filter(|(key, _)| key.as_str() != "hash")
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn verify_at(&self, request: &CallbackRequest, now: i64) -> Result<SocialUser, ProviderError> {
        let hash = request
            .get("hash")
            .ok_or_else(|| ProviderError::MissingParameter("hash".to_string()))?;
        let expected = hex::decode(hash).map_err(|_| ProviderError::InvalidSignature)?;

        let secret = Sha256::digest(self.bot_token.as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        mac.update(Self::data_check_string(request).as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| ProviderError::InvalidSignature)?;

        let auth_date: i64 = request
            .get("auth_date")
            .ok_or_else(|| ProviderError::MissingParameter("auth_date".to_string()))?
            .parse()
            .map_err(|_| ProviderError::Profile("auth_date is not a timestamp".to_string()))?;
        if now.saturating_sub(auth_date) > self.max_age_secs {
            return Err(ProviderError::Expired);
        }

        let id = request
            .get("id")
            .ok_or_else(|| ProviderError::MissingParameter("id".to_string()))?;

        let full_name = [request.get("first_name"), request.get("last_name")]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(SocialUser {
            id: id.to_string(),
            email: None,
            nickname: request.get("username").map(str::to_string),
            name: (!full_name.is_empty()).then_some(full_name),
            avatar: request.get("photo_url").map(str::to_string),
        })
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl Provider for TelegramProvider {
    async fn redirect(&self) -> Result<ProviderRedirect, ProviderError> {
        Ok(ProviderRedirect::new(RedirectResponse::Text(self.widget_html())))
    }

    // 签名本身就是校验，不依赖会话状态
    async fn user(
        &self,
        request: &CallbackRequest,
        _verification: Verification,
    ) -> Result<SocialUser, ProviderError> {
        self.verify_at(request, chrono::Utc::now().timestamp())
    }
}
