//! # 账号绑定
//!
//! 社交登录的核心流程：
//! - `redirect`：校验驱动后交给客户端生成授权跳转
//! - `callback`：换取第三方身份，绑定到当前用户或登录/创建本地用户，然后按配置跳转

mod accounts;
mod has_socials;
mod redirects;

pub use accounts::{AccountStore, display_name, fallback_email};
pub use has_socials::HasLinkedIdentities;
pub use redirects::{RedirectTarget, RouteRegistry};

use entity::users;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::{RedirectKey, SocialiteConfig};
use crate::error::{LinkError, Result};
use crate::session::Session;
use crate::socialite::{
    CallbackRequest, Provider, RedirectInstruction, SocialUser, SocialiteManager, Verification,
};
use crate::{linfo, lwarn, logging::{LogComponent, LogStage}};

/// 闪存错误使用的键
pub const ERROR_KEY: &str = "socialite";

/// 账号绑定器
#[derive(Debug, Clone)]
pub struct AccountLinker {
    config: SocialiteConfig,
    routes: RouteRegistry,
    socialite: Arc<SocialiteManager>,
    accounts: AccountStore,
}

impl AccountLinker {
    #[must_use]
    pub fn new(
        config: SocialiteConfig,
        routes: RouteRegistry,
        socialite: Arc<SocialiteManager>,
        db: DatabaseConnection,
    ) -> Self {
        let accounts = AccountStore::new(db, config.password_hash_cost);
        Self {
            config,
            routes,
            socialite,
            accounts,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SocialiteConfig {
        &self.config
    }

    #[must_use]
    pub const fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// 校验驱动并取出对应的客户端
    fn provider(&self, driver: &str) -> Result<Arc<dyn Provider>> {
        if !self.config.is_configured(driver) {
            return Err(LinkError::unknown_driver(driver));
        }

        self.socialite.driver(driver).ok_or_else(|| {
            LinkError::dependency_missing(format!("no client registered for driver [{driver}]"))
        })
    }

    /// 发起授权跳转
    pub async fn redirect(&self, driver: &str, session: &mut Session) -> Result<RedirectTarget> {
        let provider = self.provider(driver)?;

        let redirect = provider
            .redirect()
            .await
            .map_err(|e| LinkError::external_auth(driver, e.to_string()))?;

        if let Some(state) = redirect.state {
            if !self.config.is_stateless(driver) {
                session.put_oauth_state(driver, state);
            }
        }

        let instruction = RedirectInstruction::from_response(driver, redirect.response)?;

        linfo!(
            session.id(),
            LogStage::Redirect,
            LogComponent::Linker,
            "redirect",
            &format!("发起授权: driver={driver}")
        );

        Ok(instruction.into())
    }

    /// 处理授权回调
    pub async fn callback(
        &self,
        driver: &str,
        request: &CallbackRequest,
        session: &mut Session,
    ) -> Result<RedirectTarget> {
        let provider = self.provider(driver)?;

        let verification = if self.config.is_stateless(driver) {
            Verification::Stateless
        } else {
            Verification::Session(session.take_oauth_state(driver))
        };

        let social = match provider.user(request, verification).await {
            Ok(social) => social,
            Err(e) => {
                let error = LinkError::external_auth(driver, e.to_string());
                lwarn!(
                    session.id(),
                    LogStage::Callback,
                    LogComponent::Linker,
                    "callback_failed",
                    &error.to_string()
                );
                session.flash_error(ERROR_KEY, error.to_string());
                return self.redirect_to_configured(RedirectKey::OnError);
            }
        };

        // 已登录：只绑定，不创建用户
        if let Some(user) = self.current_user(session).await? {
            self.accounts.upsert(user.id, driver, &social).await?;
            self.sync_profile(&user, &social, driver).await?;

            linfo!(
                session.id(),
                LogStage::Authentication,
                LogComponent::Linker,
                "bind",
                &format!("已绑定: user_id={}, driver={driver}", user.id)
            );
            return self.redirect_to_configured(RedirectKey::AfterBind);
        }

        if let Some(account) = self.accounts.find_by_identity(driver, &social.id).await? {
            if let Some(owner) = self.accounts.find_user(account.user_id).await? {
                self.accounts.upsert(owner.id, driver, &social).await?;
                self.sync_profile(&owner, &social, driver).await?;
                session.login_using_id(owner.id);

                linfo!(
                    session.id(),
                    LogStage::Authentication,
                    LogComponent::Linker,
                    "login",
                    &format!("已登录: user_id={}, driver={driver}", owner.id)
                );
                return self.redirect_to_configured(RedirectKey::AfterLogin);
            }

            // 绑定记录保留原样，按新身份继续
            lwarn!(
                session.id(),
                LogStage::Authentication,
                LogComponent::Linker,
                "orphaned_account",
                &format!(
                    "绑定记录 {} 指向不存在的用户 {}，将重新解析用户",
                    account.id, account.user_id
                )
            );
        }

        let user = self.accounts.resolve_user(&social, driver).await?;
        self.accounts.upsert(user.id, driver, &social).await?;
        self.sync_profile(&user, &social, driver).await?;
        session.login_using_id(user.id);

        linfo!(
            session.id(),
            LogStage::Authentication,
            LogComponent::Linker,
            "login",
            &format!("已登录: user_id={}, driver={driver}", user.id)
        );
        self.redirect_to_configured(RedirectKey::AfterLogin)
    }

    /// 按配置键解析跳转目标
    pub fn redirect_to_configured(&self, key: RedirectKey) -> Result<RedirectTarget> {
        self.routes.resolve(self.config.redirect_target(key))
    }

    /// 会话中的登录用户，用户已被删除时注销会话并按未登录处理
    async fn current_user(&self, session: &mut Session) -> Result<Option<users::Model>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };

        let user = self.accounts.find_user(user_id).await?;
        if user.is_none() {
            lwarn!(
                session.id(),
                LogStage::Authentication,
                LogComponent::Linker,
                "stale_session",
                &format!("会话中的用户 {user_id} 已不存在，注销会话")
            );
            session.logout();
        }
        Ok(user)
    }

    async fn sync_profile(&self, user: &users::Model, social: &SocialUser, driver: &str) -> Result<()> {
        match self.config.display_name_fallback(driver) {
            Some(fallback) => self.accounts.sync_display_name(user, social, fallback).await,
            None => Ok(()),
        }
    }
}
