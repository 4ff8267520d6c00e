//! # 测试辅助函数
//!
//! 提供通用的测试工具和辅助函数

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Once;
use tracing::Level;

use crate::config::{RedirectsConfig, SocialiteConfig};
use crate::linker::RouteRegistry;

static INIT: Once = Once::new();

/// 初始化测试日志
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 创建已迁移的内存数据库连接
///
/// 只保留一条连接，连接级的 PRAGMA 才会对后续查询生效。
pub async fn create_test_db() -> DatabaseConnection {
    init_test_env();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("连接内存数据库失败");
    migration::Migrator::up(&db, None)
        .await
        .expect("运行迁移失败");
    db
}

/// 关闭外键约束，用于构造孤立的绑定记录
pub async fn disable_foreign_keys(db: &DatabaseConnection) {
    db.execute_unprepared("PRAGMA foreign_keys = OFF")
        .await
        .expect("关闭外键约束失败");
}

/// 测试用社交登录配置：github 走会话校验，telegram 无状态
pub fn test_socialite_config() -> SocialiteConfig {
    SocialiteConfig {
        drivers: BTreeMap::from([
            ("github".to_string(), "fa-github".to_string()),
            ("telegram".to_string(), "fa-telegram".to_string()),
        ]),
        stateless_drivers: HashMap::from([("telegram".to_string(), true)]),
        redirects: RedirectsConfig {
            after_login: "/home".to_string(),
            after_bind: "route:profile".to_string(),
            on_error: "route:login".to_string(),
        },
        password_hash_cost: 4,
        ..SocialiteConfig::default()
    }
}

/// 测试用命名路由
pub fn test_routes() -> RouteRegistry {
    RouteRegistry::new(HashMap::from([
        ("login".to_string(), "/login".to_string()),
        ("profile".to_string(), "/profile/social".to_string()),
    ]))
}
