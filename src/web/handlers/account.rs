//! # 会话与已绑定账号

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use tower_cookies::Cookies;

use crate::linker::HasLinkedIdentities;
use crate::web::{AppState, response};

/// 已绑定的第三方账号
#[derive(Debug, Serialize)]
pub struct LinkedAccount {
    pub driver: String,
    pub identity: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl From<entity::social_accounts::Model> for LinkedAccount {
    fn from(model: entity::social_accounts::Model) -> Self {
        Self {
            driver: model.driver,
            identity: model.identity,
            username: model.username,
            email: model.email,
            avatar: model.avatar,
        }
    }
}

/// `GET /`：当前会话状态
pub async fn home(State(state): State<AppState>, cookies: Cookies) -> Response {
    let session = state.sessions.load_from_cookies(&cookies).await;
    response::success(serde_json::json!({
        "authenticated": session.check(),
        "user_id": session.user_id(),
    }))
}

/// `GET /login`：登录页，读取并清除闪存错误
pub async fn login(State(state): State<AppState>, cookies: Cookies) -> Response {
    let mut session = state.sessions.load_from_cookies(&cookies).await;
    let errors = session.take_errors();
    state.sessions.persist(&cookies, &session).await;

    response::success(serde_json::json!({
        "authenticated": session.check(),
        "errors": errors,
    }))
}

/// `POST /logout`
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    let mut session = state.sessions.load_from_cookies(&cookies).await;
    session.logout();
    state.sessions.persist(&cookies, &session).await;
    response::success_without_data("已退出登录")
}

/// `GET /api/me/social-accounts`：当前用户绑定的第三方账号
pub async fn social_accounts(State(state): State<AppState>, cookies: Cookies) -> Response {
    let session = state.sessions.load_from_cookies(&cookies).await;
    let Some(user_id) = session.user_id() else {
        return response::error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "请先登录");
    };

    let user = match state.linker.accounts().find_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return response::error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "用户不存在");
        }
        Err(e) => return response::app_error(e),
    };

    match user.linked_identities(&state.db).await {
        Ok(accounts) => response::success(
            accounts
                .into_iter()
                .map(LinkedAccount::from)
                .collect::<Vec<_>>(),
        ),
        Err(e) => response::app_error(e),
    }
}
