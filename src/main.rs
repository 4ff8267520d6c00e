//! # Social Link 主程序

use std::sync::Arc;

use social_link::{
    LinkError, Result,
    config::ConfigManager,
    database, lerror, linfo,
    linker::{AccountLinker, RouteRegistry},
    logging::{self, LogComponent, LogStage},
    session::SessionStore,
    socialite::SocialiteManager,
    web::{AppContext, HttpServer},
};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--logging-help") {
        logging::print_logging_help();
        return Ok(());
    }

    let config_manager = ConfigManager::new()?;
    let config = config_manager.get_config();

    logging::init_optimized_logging(config.server.log_level.as_ref());

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "config_loaded",
        &format!("配置已加载: {}", config_manager.source_path().display())
    );

    let db = database::init_database(&config.database).await?;
    database::run_migrations(&db)
        .await
        .map_err(|e| LinkError::database_with_source("数据库迁移失败", e))?;
    database::check_database_status(&db)
        .await
        .map_err(|e| LinkError::database_with_source("数据库状态检查失败", e))?;

    let socialite = Arc::new(SocialiteManager::from_config(&config.socialite)?);
    let linker = AccountLinker::new(
        config.socialite.clone(),
        RouteRegistry::new(config.routes.clone()),
        socialite,
        db.clone(),
    );

    let context = Arc::new(AppContext {
        config: Arc::clone(&config),
        linker,
        sessions: SessionStore::new(&config.session),
        db,
    });

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动"
    );
    if let Err(e) = HttpServer::new(config.server.clone(), context).serve().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        return Err(e);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}
