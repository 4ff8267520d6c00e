//! # 错误处理测试

use crate::error::{Context, ErrorCategory, LinkError};
use axum::http::StatusCode;
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = LinkError::config("测试配置错误");
    assert!(matches!(err, LinkError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: 测试配置错误");
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = LinkError::config_with_source("配置文件加载失败", io_err);

    assert!(matches!(err, LinkError::Config { .. }));
    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_unknown_driver_is_not_found() {
    let err = LinkError::unknown_driver("myspace");
    assert_eq!(
        err.to_string(),
        "Socialite driver [myspace] is not configured."
    );
    assert_eq!(err.to_http_response_parts(), (StatusCode::NOT_FOUND, "DRIVER_NOT_FOUND"));
    assert_eq!(err.category(), ErrorCategory::Client);
}

#[test]
fn test_unsupported_response_names_driver_and_shape() {
    let err = LinkError::unsupported_response("github", "json object");
    let message = err.to_string();
    assert!(message.contains("[github]"));
    assert!(message.contains("json object"));
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[test]
fn test_external_auth_message() {
    let err = LinkError::external_auth("telegram", "hash mismatch");
    assert_eq!(
        err.to_string(),
        "Authorization via [telegram] failed: hash mismatch"
    );
}

#[test]
fn test_context_keeps_inner_status() {
    let result: Result<(), LinkError> = Err(LinkError::unknown_driver("x"));
    let err = result.context("处理回调失败").unwrap_err();

    assert!(matches!(err, LinkError::Context { .. }));
    assert!(err.to_string().starts_with("处理回调失败"));
    assert_eq!(err.to_http_response_parts().0, StatusCode::NOT_FOUND);
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err: LinkError = io_err.into();

    assert!(matches!(err, LinkError::Io { .. }));
    assert!(err.to_string().contains("IO错误: 文件操作失败"));
}

#[test]
fn test_auto_conversion_from_toml_error() {
    let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
    let err: LinkError = toml_err.into();

    assert!(matches!(err, LinkError::Config { .. }));
    assert!(err.to_string().contains("配置错误: TOML解析失败"));
}

#[test]
fn test_auto_conversion_from_db_error() {
    let err: LinkError = sea_orm::DbErr::Custom("boom".to_string()).into();

    assert!(matches!(err, LinkError::Database { .. }));
    assert_eq!(
        err.to_http_response_parts(),
        (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
    );
}

#[test]
fn test_error_macros() {
    let err = crate::config_error!("缺少 {} 配置", "redirects.on_error");
    assert_eq!(err.to_string(), "配置错误: 缺少 redirects.on_error 配置");

    let err = crate::database_error!("用户 {} 不存在", 7);
    assert!(matches!(err, LinkError::Database { .. }));
}
