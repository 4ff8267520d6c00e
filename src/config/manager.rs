//! # 配置管理器
//!
//! 统一的配置加载入口，支持环境变量覆盖

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AppConfig;
use crate::error::{Context, LinkError, Result};
use crate::{ldebug, linfo, logging::{LogComponent, LogStage}};

/// 支持的环境变量覆盖，按优先级排列
const DATABASE_URL_VARS: [&str; 2] = ["SOCIAL_LINK_DATABASE_URL", "DATABASE_URL"];
const BIND_ADDRESS_VAR: &str = "SOCIAL_LINK_BIND_ADDRESS";
const PORT_VAR: &str = "SOCIAL_LINK_PORT";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 配置文件路径
    source: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Result<Self> {
        // 优先使用环境变量指定的配置文件路径
        let config_file = if let Ok(path) = env::var("SOCIAL_LINK_CONFIG_PATH") {
            path
        } else {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        };

        Self::from_file(&config_file)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(LinkError::config(format!(
                "配置文件不存在: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("读取配置文件失败: {}", config_path.display()))?;

        let config = Self::parse(&content, |key| env::var(key).ok())?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            &format!(
                "配置加载完成: {}，允许的驱动 {} 个",
                config_path.display(),
                config.socialite.drivers.len()
            )
        );

        Ok(Self {
            config: Arc::new(config),
            source: config_path.to_path_buf(),
        })
    }

    /// 解析 TOML 内容，应用环境变量覆盖并验证
    pub fn parse<F>(content: &str, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: AppConfig = toml::from_str(content)?;

        Self::apply_env_overrides(&mut config, lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// 获取当前配置
    #[must_use]
    pub fn get_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置文件路径
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = DATABASE_URL_VARS.iter().find_map(|key| lookup(key)) {
            ldebug!("system", LogStage::Configuration, LogComponent::Config, "env_override", "应用环境变量覆盖: database.url");
            config.database.url = url;
        }

        if let Some(address) = lookup(BIND_ADDRESS_VAR) {
            ldebug!("system", LogStage::Configuration, LogComponent::Config, "env_override", &format!("应用环境变量覆盖: server.bind_address = {address}"));
            config.server.bind_address = address;
        }

        if let Some(port) = lookup(PORT_VAR) {
            config.server.port = port.parse().map_err(|e| {
                LinkError::config_with_source(format!("无效的端口号: {port}"), e)
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [server]
        bind_address = "0.0.0.0"
        port = 3000

        [database]
        url = "sqlite::memory:"
        max_connections = 1
        connect_timeout = 5

        [socialite]
        drivers = { github = "fa-github", telegram = "fa-telegram" }
        stateless_drivers = { telegram = true }

        [socialite.redirects]
        after_login = "/dashboard"
        on_error = "route:login"

        [socialite.providers.github]
        kind = "oauth2"
        preset = "github"
        client_id = "id"
        client_secret = "secret"
        redirect_uri = "http://localhost:3000/auth/github/callback"
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_sample() {
        let config = ConfigManager::parse(SAMPLE, no_env).unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.socialite.is_configured("github"));
        assert!(config.socialite.is_stateless("telegram"));
        assert!(!config.socialite.is_stateless("github"));
        assert_eq!(config.socialite.redirects.after_login, "/dashboard");
        // 未配置的跳转目标使用默认值
        assert_eq!(config.socialite.redirects.after_bind, "/");
        assert_eq!(config.routes.get("login").map(String::as_str), Some("/login"));
        assert_eq!(
            config.socialite.display_name_fallback("telegram"),
            Some("Telegram user")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("DATABASE_URL", "sqlite://./data/other.db"),
            ("SOCIAL_LINK_PORT", "9999"),
        ]);
        let config =
            ConfigManager::parse(SAMPLE, |key| env.get(key).map(ToString::to_string)).unwrap();

        assert_eq!(config.database.url, "sqlite://./data/other.db");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_invalid_port_override() {
        let result = ConfigManager::parse(SAMPLE, |key| {
            (key == "SOCIAL_LINK_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(LinkError::Config { .. })));
    }

    #[test]
    fn test_provider_outside_allow_list_rejected() {
        let content = r#"
            [socialite]
            drivers = { github = "" }

            [socialite.providers.gitlab]
            kind = "oauth2"
            preset = "gitlab"
            client_id = "id"
            redirect_uri = "http://localhost/auth/gitlab/callback"
        "#;
        let err = ConfigManager::parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("gitlab"));
    }

    #[test]
    fn test_undefined_route_target_rejected() {
        let content = r#"
            [socialite.redirects]
            on_error = "route:signin"
        "#;
        let err = ConfigManager::parse(content, no_env).unwrap_err();
        assert!(err.to_string().contains("signin"));
    }

    #[test]
    fn test_hash_cost_bounds() {
        let content = r#"
            [socialite]
            password_hash_cost = 2
        "#;
        assert!(ConfigManager::parse(content, no_env).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::from_file("config/does-not-exist.toml");
        assert!(matches!(result, Err(LinkError::Config { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ConfigManager::parse("[server\nport = 1", no_env).unwrap_err();
        assert!(matches!(err, LinkError::Config { .. }));
        assert!(err.to_string().contains("TOML解析失败"));
    }
}
