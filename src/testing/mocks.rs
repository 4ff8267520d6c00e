//! # 测试 Mock 对象
//!
//! 基于 `MockProvider` 的常用预设

use url::Url;

use crate::socialite::{
    MockProvider, OAuthState, ProviderError, ProviderRedirect, RedirectResponse, SocialUser,
};

/// 回调时返回固定身份的客户端
pub fn provider_returning(user: SocialUser) -> MockProvider {
    let mut provider = MockProvider::new();
    provider
        .expect_user()
        .returning(move |_, _| Ok(user.clone()));
    provider
}

/// 回调时总是失败的客户端
pub fn provider_failing(message: &'static str) -> MockProvider {
    let mut provider = MockProvider::new();
    provider
        .expect_user()
        .returning(move |_, _| Err(ProviderError::Denied(message.to_string())));
    provider
}

/// 跳转到授权地址并携带会话状态的客户端
pub fn provider_redirecting(url: &str, state: Option<OAuthState>) -> MockProvider {
    let url = Url::parse(url).expect("无效的测试URL");
    let mut provider = MockProvider::new();
    provider.expect_redirect().returning(move || {
        let redirect = ProviderRedirect::new(RedirectResponse::Redirect(url.clone()));
        Ok(match state.clone() {
            Some(state) => redirect.with_state(state),
            None => redirect,
        })
    });
    provider
}

/// 跳转阶段返回任意原始结果的客户端
pub fn provider_responding(response: RedirectResponse) -> MockProvider {
    let mut provider = MockProvider::new();
    provider
        .expect_redirect()
        .returning(move || Ok(ProviderRedirect::new(response.clone())));
    provider
}
