//! # 跳转目标
//!
//! 配置中的跳转目标解析，以及 HTTP 层的响应转换

use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use std::collections::HashMap;

use crate::config::ROUTE_PREFIX;
use crate::error::{LinkError, Result};
use crate::socialite::RedirectInstruction;

/// 账号绑定流程的最终响应：302 跳转或直接输出的响应体
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Redirect(String),
    Body(String),
}

impl RedirectTarget {
    /// 跳转地址，响应体时为 `None`
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect(location) => Some(location),
            Self::Body(_) => None,
        }
    }
}

impl From<RedirectInstruction> for RedirectTarget {
    fn from(instruction: RedirectInstruction) -> Self {
        match instruction {
            RedirectInstruction::Url(url) => Self::Redirect(url),
            RedirectInstruction::Body(body) => Self::Body(body),
        }
    }
}

impl IntoResponse for RedirectTarget {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(location) => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Self::Body(body) => Html(body).into_response(),
        }
    }
}

/// 命名路由表
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: HashMap<String, String>,
}

impl RouteRegistry {
    #[must_use]
    pub const fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// 命名路由对应的路径
    pub fn url_for(&self, name: &str) -> Result<&str> {
        self.routes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| LinkError::route_not_found(name))
    }

    /// 解析跳转目标：`route:<name>` 走命名路由，其余按字面处理
    pub fn resolve(&self, target: &str) -> Result<RedirectTarget> {
        let location = match target.strip_prefix(ROUTE_PREFIX) {
            Some(name) => self.url_for(name)?.to_string(),
            None => target.to_string(),
        };
        Ok(RedirectTarget::Redirect(location))
    }
}
