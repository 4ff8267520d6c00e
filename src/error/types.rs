//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

use super::ErrorCategory;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum LinkError {
    /// 驱动不在允许列表中
    #[error("Socialite driver [{driver}] is not configured.")]
    UnknownDriver { driver: String },

    /// OAuth 客户端缺失（配置了驱动但没有可用的客户端实现）
    #[error("Please install the Socialite client: {message}")]
    DependencyMissing { message: String },

    /// OAuth 客户端返回了无法识别的重定向结果
    #[error("Unsupported redirect response from Socialite driver [{driver}]: {kind}")]
    UnsupportedResponse { driver: String, kind: String },

    /// 外部授权失败，回调流程中会被吸收并转为错误重定向
    #[error("Authorization via [{driver}] failed: {message}")]
    ExternalAuth { driver: String, message: String },

    /// 命名路由不存在
    #[error("Route [{name}] not defined.")]
    RouteNotFound { name: String },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 附加上下文的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<LinkError>,
    },
}

impl LinkError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::UnknownDriver { .. } => (StatusCode::NOT_FOUND, "DRIVER_NOT_FOUND"),
            Self::DependencyMissing { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DEPENDENCY_MISSING")
            }
            Self::UnsupportedResponse { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UNSUPPORTED_RESPONSE")
            }
            Self::ExternalAuth { .. } => (StatusCode::UNAUTHORIZED, "EXTERNAL_AUTH_FAILED"),
            Self::RouteNotFound { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "ROUTE_NOT_FOUND"),
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::Database { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 错误分类（客户端/服务端）
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        if self.to_http_response_parts().0.is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }

    /// 创建未知驱动错误
    pub fn unknown_driver<T: Into<String>>(driver: T) -> Self {
        Self::UnknownDriver {
            driver: driver.into(),
        }
    }

    /// 创建依赖缺失错误
    pub fn dependency_missing<T: Into<String>>(message: T) -> Self {
        Self::DependencyMissing {
            message: message.into(),
        }
    }

    /// 创建不支持的重定向响应错误
    pub fn unsupported_response<D: Into<String>, K: Into<String>>(driver: D, kind: K) -> Self {
        Self::UnsupportedResponse {
            driver: driver.into(),
            kind: kind.into(),
        }
    }

    /// 创建外部授权失败错误
    pub fn external_auth<D: Into<String>, M: Into<String>>(driver: D, message: M) -> Self {
        Self::ExternalAuth {
            driver: driver.into(),
            message: message.into(),
        }
    }

    /// 创建命名路由不存在错误
    pub fn route_not_found<T: Into<String>>(name: T) -> Self {
        Self::RouteNotFound { name: name.into() }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建数据库错误
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<sea_orm::error::DbErr> for LinkError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<bcrypt::BcryptError> for LinkError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::internal_with_source("密码处理失败", err)
    }
}

impl From<url::ParseError> for LinkError {
    fn from(err: url::ParseError) -> Self {
        Self::config_with_source("URL解析失败", err)
    }
}
