//! # 日志配置模块
//!
//! 初始化 tracing 订阅器，并提供带阶段/组件标签的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志所处的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Configuration,
    Redirect,
    Callback,
    Authentication,
    Db,
    Session,
    RequestHandling,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::Redirect => "redirect",
            Self::Callback => "callback",
            Self::Authentication => "authentication",
            Self::Db => "db",
            Self::Session => "session",
            Self::RequestHandling => "request_handling",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    Database,
    ServerSetup,
    Linker,
    Accounts,
    Socialite,
    OAuth,
    Telegram,
    Session,
    Http,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Database => "database",
            Self::ServerSetup => "server_setup",
            Self::Linker => "linker",
            Self::Accounts => "accounts",
            Self::Socialite => "socialite",
            Self::OAuth => "oauth",
            Self::Telegram => "telegram",
            Self::Session => "session",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __structured_log {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+,)?
            "{}",
            $message
        )
    };
}

/// 结构化 info 日志: `linfo!(request_id, stage, component, operation, message [, fields])`
#[macro_export]
macro_rules! linfo {
    ($($arg:tt)+) => {
        $crate::__structured_log!(info, $($arg)+)
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($($arg:tt)+) => {
        $crate::__structured_log!(warn, $($arg)+)
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($($arg:tt)+) => {
        $crate::__structured_log!(error, $($arg)+)
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($($arg:tt)+) => {
        $crate::__structured_log!(debug, $($arg)+)
    };
}

/// 初始化日志系统
pub fn init_optimized_logging(log_level: Option<&String>) {
    let level = log_level.map_or("info", std::string::String::as_str);

    // 默认关闭 SQL 语句级日志
    let default_filter = format!(
        "{level},social_link=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn,tower_http=info"
    );

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    let init_result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if init_result.is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}

/// 环境变量设置指南
pub fn print_logging_help() {
    println!("📋 日志配置指南:");
    println!("  RUST_LOG=info                        # 标准日志级别");
    println!("  RUST_LOG=debug                       # 调试级别");
    println!("  RUST_LOG=info,sqlx::query=info       # 开发环境：启用数据库查询日志");
    println!("  RUST_LOG=social_link=trace           # 账号绑定流程详细追踪");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(LogStage::Callback.to_string(), "callback");
        assert_eq!(LogComponent::OAuth.as_str(), "oauth");
    }

    #[test]
    fn test_macros_expand() {
        let driver = "github";
        crate::linfo!(
            "req-1",
            LogStage::Redirect,
            LogComponent::Linker,
            "redirect_start",
            "redirect issued"
        );
        crate::lwarn!(
            "req-1",
            LogStage::Callback,
            LogComponent::Linker,
            "callback_fail",
            &format!("callback failed for {driver}"),
            driver = driver
        );
    }
}
