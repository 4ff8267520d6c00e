//! # 授权跳转与回调

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, Query, State};
use axum::response::{IntoResponse, Response};
use std::collections::BTreeMap;
use tower_cookies::Cookies;

use crate::socialite::CallbackRequest;
use crate::web::AppState;
use crate::{ldebug, logging::{LogComponent, LogStage}};

type Params = BTreeMap<String, String>;

/// `GET {prefix}/{driver}/redirect`
pub async fn redirect(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(driver): Path<String>,
) -> Response {
    let mut session = state.sessions.load_from_cookies(&cookies).await;

    match state.linker.redirect(&driver, &mut session).await {
        Ok(target) => {
            state.sessions.persist(&cookies, &session).await;
            target.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `GET|POST {prefix}/{driver}/callback`
///
/// 查询参数与表单参数合并后交给驱动，同名时表单优先
pub async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(driver): Path<String>,
    Query(query): Query<Params>,
    form: Result<Form<Params>, FormRejection>,
) -> Response {
    let mut session = state.sessions.load_from_cookies(&cookies).await;

    let mut params = query;
    if let Ok(Form(body)) = form {
        params.extend(body);
    }
    ldebug!(
        session.id(),
        LogStage::Callback,
        LogComponent::Http,
        "callback_params",
        &format!("收到回调: driver={driver}, params={}", params.len())
    );

    let request = CallbackRequest::new(params);
    match state.linker.callback(&driver, &request, &mut session).await {
        Ok(target) => {
            state.sessions.persist(&cookies, &session).await;
            target.into_response()
        }
        Err(e) => e.into_response(),
    }
}
