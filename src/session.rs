//! # 会话
//!
//! 基于 moka 的内存会话存储。浏览器只持有会话 ID Cookie，
//! 登录状态、闪存错误和各驱动的授权状态都保存在服务端。

use moka::future::Cache;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::socialite::OAuthState;
use crate::{ldebug, logging::{LogComponent, LogStage}};

/// 服务端保存的会话数据
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    user_id: Option<i32>,
    oauth: HashMap<String, OAuthState>,
    errors: BTreeMap<String, String>,
}

/// 一次请求内使用的会话
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    /// 登录后换发新 ID 时记录旧 ID，保存时失效
    previous_id: Option<String>,
    data: SessionData,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// 创建匿名会话
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            previous_id: None,
            data: SessionData::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 是否已登录
    #[must_use]
    pub const fn check(&self) -> bool {
        self.data.user_id.is_some()
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<i32> {
        self.data.user_id
    }

    /// 以指定用户登录，同时换发会话 ID
    pub fn login_using_id(&mut self, user_id: i32) {
        self.data.user_id = Some(user_id);
        self.regenerate();
    }

    pub fn logout(&mut self) {
        self.data = SessionData::default();
        self.regenerate();
    }

    fn regenerate(&mut self) {
        let old = std::mem::replace(&mut self.id, Uuid::new_v4().to_string());
        self.previous_id.get_or_insert(old);
    }

    /// 写入闪存错误，读取一次后清除
    pub fn flash_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.data.errors.insert(key.into(), message.into());
    }

    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.data.errors
    }

    pub fn take_errors(&mut self) -> BTreeMap<String, String> {
        std::mem::take(&mut self.data.errors)
    }

    pub fn put_oauth_state(&mut self, driver: impl Into<String>, state: OAuthState) {
        self.data.oauth.insert(driver.into(), state);
    }

    /// 取出驱动的授权状态，每个状态只能使用一次
    pub fn take_oauth_state(&mut self, driver: &str) -> Option<OAuthState> {
        self.data.oauth.remove(driver)
    }
}

/// 会话存储
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<String, SessionData>,
    cookie_name: String,
    secure_cookie: bool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("cookie_name", &self.cookie_name)
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(Duration::from_secs(config.idle_timeout_secs))
            .build();

        Self {
            cache,
            cookie_name: config.cookie_name.clone(),
            secure_cookie: config.secure_cookie,
        }
    }

    /// 按会话 ID 加载，不存在或已过期时返回新的匿名会话
    pub async fn load(&self, id: Option<&str>) -> Session {
        if let Some(id) = id {
            if let Some(data) = self.cache.get(id).await {
                return Session {
                    id: id.to_string(),
                    previous_id: None,
                    data,
                };
            }
        }
        Session::new()
    }

    pub async fn save(&self, session: &Session) {
        if let Some(previous) = &session.previous_id {
            self.cache.invalidate(previous).await;
        }
        self.cache
            .insert(session.id.clone(), session.data.clone())
            .await;
    }

    /// 从请求 Cookie 中加载会话
    pub async fn load_from_cookies(&self, cookies: &Cookies) -> Session {
        let id = cookies.get(&self.cookie_name).map(|c| c.value().to_string());
        self.load(id.as_deref()).await
    }

    /// 保存会话并写回 Cookie
    pub async fn persist(&self, cookies: &Cookies, session: &Session) {
        self.save(session).await;
        ldebug!(
            session.id(),
            LogStage::Session,
            LogComponent::Session,
            "persist",
            "会话已保存"
        );
        cookies.add(self.cookie(session.id()));
    }

    fn cookie(&self, id: &str) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), id.to_string()))
            .http_only(true)
            .secure(self.secure_cookie)
            .path("/")
            .same_site(SameSite::Lax)
            .build()
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(&SessionConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_id_yields_anonymous_session() {
        let session = store().load(Some("missing")).await;
        assert!(!session.check());
        assert_ne!(session.id(), "missing");
    }

    #[tokio::test]
    async fn test_login_regenerates_id() {
        let store = store();
        let mut session = store.load(None).await;
        store.save(&session).await;
        let anonymous_id = session.id().to_string();

        session.login_using_id(7);
        store.save(&session).await;

        assert_ne!(session.id(), anonymous_id);
        assert_eq!(store.load(Some(session.id())).await.user_id(), Some(7));
        assert!(!store.load(Some(&anonymous_id)).await.check());
    }

    #[tokio::test]
    async fn test_flash_errors_are_consumed() {
        let mut session = Session::new();
        session.flash_error("socialite", "boom");

        assert_eq!(session.take_errors().get("socialite").map(String::as_str), Some("boom"));
        assert!(session.errors().is_empty());
    }

    #[test]
    fn test_oauth_state_is_single_use() {
        let mut session = Session::new();
        session.put_oauth_state(
            "github",
            OAuthState {
                state: "s".to_string(),
                pkce_verifier: None,
            },
        );

        assert!(session.take_oauth_state("github").is_some());
        assert!(session.take_oauth_state("github").is_none());
    }

    #[test]
    fn test_logout_clears_data() {
        let mut session = Session::new();
        session.login_using_id(1);
        session.flash_error("socialite", "x");
        session.logout();

        assert!(!session.check());
        assert!(session.errors().is_empty());
    }
}
