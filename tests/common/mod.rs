//! # 集成测试公共设施

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use hmac::{Hmac, Mac};
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use url::Url;

use social_link::config::{
    AppConfig, ProviderConfig, RedirectsConfig, SocialiteConfig, TelegramProviderConfig,
};
use social_link::linker::{AccountLinker, RouteRegistry};
use social_link::session::SessionStore;
use social_link::testing::create_test_db;
use social_link::socialite::{
    CallbackRequest, OAuthState, Provider, ProviderError, ProviderRedirect, RedirectResponse,
    SocialUser, SocialiteManager, Verification,
};
use social_link::web::{AppContext, build_router};

pub const BOT_TOKEN: &str = "123456:INTEGRATION-TOKEN";
pub const COOKIE_NAME: &str = "social_link_session";

/// 模拟授权码流程的客户端：跳转时下发 state，回调时核对
pub struct FakeOAuthProvider {
    pub user: SocialUser,
}

#[async_trait]
impl Provider for FakeOAuthProvider {
    async fn redirect(&self) -> Result<ProviderRedirect, ProviderError> {
        let state = uuid::Uuid::new_v4().to_string();
        let url = Url::parse_with_params("https://provider.test/authorize", [("state", &state)])
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(
            ProviderRedirect::new(RedirectResponse::Redirect(url)).with_state(OAuthState {
                state,
                pkce_verifier: None,
            }),
        )
    }

    async fn user(
        &self,
        request: &CallbackRequest,
        verification: Verification,
    ) -> Result<SocialUser, ProviderError> {
        let Verification::Session(Some(saved)) = verification else {
            return Err(ProviderError::InvalidState);
        };
        if request.get("state") != Some(saved.state.as_str()) {
            return Err(ProviderError::InvalidState);
        }
        request
            .get("code")
            .ok_or_else(|| ProviderError::MissingParameter("code".to_string()))?;
        Ok(self.user.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub fn app_config() -> AppConfig {
    let socialite = SocialiteConfig {
        drivers: BTreeMap::from([
            ("github".to_string(), "GitHub".to_string()),
            ("telegram".to_string(), "Telegram".to_string()),
            ("gitlab".to_string(), "GitLab".to_string()),
        ]),
        stateless_drivers: HashMap::from([("telegram".to_string(), true)]),
        redirects: RedirectsConfig {
            after_login: "/home".to_string(),
            after_bind: "route:profile".to_string(),
            on_error: "route:login".to_string(),
        },
        password_hash_cost: 4,
        providers: HashMap::from([(
            "telegram".to_string(),
            ProviderConfig::Telegram(TelegramProviderConfig {
                bot_token: BOT_TOKEN.to_string(),
                bot_username: "integration_bot".to_string(),
                redirect_uri: "http://localhost/auth/telegram/callback".to_string(),
                max_age_secs: 86_400,
            }),
        )]),
        ..SocialiteConfig::default()
    };

    AppConfig {
        socialite,
        routes: HashMap::from([
            ("login".to_string(), "/login".to_string()),
            ("profile".to_string(), "/profile/social".to_string()),
        ]),
        ..AppConfig::default()
    }
}

/// 组装完整应用：telegram 使用真实客户端，github 使用模拟客户端，gitlab 没有客户端
pub async fn spawn_app(github_user: SocialUser) -> TestApp {
    let github: Arc<dyn Provider> = Arc::new(FakeOAuthProvider { user: github_user });
    spawn_with_config(app_config(), vec![("github", github)]).await
}

/// 按给定配置组装应用，`extra` 中的客户端覆盖配置生成的同名客户端
pub async fn spawn_with_config(
    config: AppConfig,
    extra: Vec<(&str, Arc<dyn Provider>)>,
) -> TestApp {
    let config = Arc::new(config);
    let db = create_test_db().await;

    let mut socialite = SocialiteManager::from_config(&config.socialite).unwrap();
    for (driver, provider) in extra {
        socialite.register(driver, provider);
    }

    let linker = AccountLinker::new(
        config.socialite.clone(),
        RouteRegistry::new(config.routes.clone()),
        Arc::new(socialite),
        db.clone(),
    );
    let context = Arc::new(AppContext {
        config: Arc::clone(&config),
        linker,
        sessions: SessionStore::new(&config.session),
        db: db.clone(),
    });

    TestApp {
        router: build_router(context),
        db,
    }
}

/// 按 Telegram 登录组件的规则签名
pub fn telegram_payload(fields: &[(&str, &str)]) -> Vec<(String, String)> {
    let sorted: BTreeMap<&str, &str> = fields.iter().copied().collect();
    let check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret = Sha256::digest(BOT_TOKEN.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).unwrap();
    mac.update(check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .chain(std::iter::once(("hash".to_string(), hash)))
        .collect()
}

pub fn encode(params: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: String, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// 响应中写回的会话 Cookie（`name=value`）
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{COOKIE_NAME}=")))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
