//! # 账号存储
//!
//! 社交账号绑定表与用户表上的读写操作

use chrono::Utc;
use entity::{social_accounts, users, SocialAccounts, Users};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use crate::database_error;
use crate::error::Result;
use crate::socialite::SocialUser;
use crate::{ldebug, linfo, logging::{LogComponent, LogStage}};

const PLACEHOLDER_PASSWORD_LEN: usize = 40;
const FALLBACK_EMAIL_DOMAIN: &str = "social.local";

/// 账号存储
#[derive(Debug, Clone)]
pub struct AccountStore {
    db: DatabaseConnection,
    password_hash_cost: u32,
}

impl AccountStore {
    #[must_use]
    pub const fn new(db: DatabaseConnection, password_hash_cost: u32) -> Self {
        Self {
            db,
            password_hash_cost,
        }
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 按 `(user_id, driver)` 插入或更新绑定记录，身份字段总是被覆盖
    pub async fn upsert(&self, user_id: i32, driver: &str, social: &SocialUser) -> Result<()> {
        let now = Utc::now().naive_utc();
        let model = social_accounts::ActiveModel {
            user_id: Set(user_id),
            driver: Set(driver.to_string()),
            identity: Set(social.id.clone()),
            username: Set(social.nickname.clone()),
            email: Set(social.email.clone()),
            avatar: Set(social.avatar.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        SocialAccounts::insert(model)
            .on_conflict(
                OnConflict::columns([
                    social_accounts::Column::UserId,
                    social_accounts::Column::Driver,
                ])
                .update_columns([
                    social_accounts::Column::Identity,
                    social_accounts::Column::Username,
                    social_accounts::Column::Email,
                    social_accounts::Column::Avatar,
                    social_accounts::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        ldebug!(
            "system",
            LogStage::Db,
            LogComponent::Accounts,
            "upsert_social_account",
            &format!("绑定记录已更新: user_id={user_id}, driver={driver}")
        );
        Ok(())
    }

    /// 按 `(driver, identity)` 查找绑定记录，多条时取最新的一条
    pub async fn find_by_identity(
        &self,
        driver: &str,
        identity: &str,
    ) -> Result<Option<social_accounts::Model>> {
        let account = SocialAccounts::find()
            .filter(social_accounts::Column::Driver.eq(driver))
            .filter(social_accounts::Column::Identity.eq(identity))
            .order_by_desc(social_accounts::Column::Id)
            .one(&self.db)
            .await?;
        Ok(account)
    }

    pub async fn find_user(&self, user_id: i32) -> Result<Option<users::Model>> {
        Ok(Users::find_by_id(user_id).one(&self.db).await?)
    }

    /// 为第三方身份找到或创建本地用户
    pub async fn resolve_user(&self, social: &SocialUser, driver: &str) -> Result<users::Model> {
        let name = display_name(social, driver);
        let email = social
            .email()
            .map_or_else(|| fallback_email(driver, &social.id), str::to_string);

        self.first_or_create_by_email(&email, &name).await
    }

    /// 按邮箱查找用户，不存在时创建
    pub async fn first_or_create_by_email(&self, email: &str, name: &str) -> Result<users::Model> {
        if let Some(user) = self.find_user_by_email(email).await? {
            return Ok(user);
        }
        self.create_by_email(email, name).await
    }

    /// 插入用户后重新读取。邮箱已被并发请求写入时插入被忽略，返回已有用户
    async fn create_by_email(&self, email: &str, name: &str) -> Result<users::Model> {
        let password_hash = bcrypt::hash(placeholder_password(), self.password_hash_cost)?;
        let now = Utc::now().naive_utc();
        let model = users::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = Users::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let user = self
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| database_error!("创建用户后无法读取: {}", email))?;

        if inserted == 0 {
            ldebug!(
                "system",
                LogStage::Db,
                LogComponent::Accounts,
                "create_user_conflict",
                &format!("邮箱已被并发写入，使用已有用户: id={}", user.id)
            );
        } else {
            linfo!(
                "system",
                LogStage::Db,
                LogComponent::Accounts,
                "create_user",
                &format!("已为社交登录创建用户: id={}", user.id)
            );
        }
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(user)
    }

    /// 用户展示名为空时，依次用第三方姓名、`@昵称`、兜底文案补全
    pub async fn sync_display_name(
        &self,
        user: &users::Model,
        social: &SocialUser,
        fallback: &str,
    ) -> Result<()> {
        if !user.name.is_empty() {
            return Ok(());
        }

        let name = social
            .name()
            .map(str::to_string)
            .or_else(|| social.nickname().map(|nick| format!("@{nick}")))
            .unwrap_or_else(|| fallback.to_string());

        let mut active = user.clone().into_active_model();
        active.name = Set(name);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(&self.db).await?;
        Ok(())
    }
}

/// 展示名：姓名，其次昵称，最后 `"<Driver> user"`
#[must_use]
pub fn display_name(social: &SocialUser, driver: &str) -> String {
    social
        .name()
        .or_else(|| social.nickname())
        .map_or_else(|| format!("{} user", capitalize(driver)), str::to_string)
}

/// 没有邮箱时使用的确定性邮箱，标识中 `[A-Za-z0-9_.-]` 以外的字符替换为 `_`
#[must_use]
pub fn fallback_email(driver: &str, identity: &str) -> String {
    let sanitized: String = identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{driver}_{sanitized}@{FALLBACK_EMAIL_DOMAIN}")
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn placeholder_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::create_test_db;
    use pretty_assertions::assert_eq;
    use sea_orm::{ConnectOptions, Database, PaginatorTrait};
    use sea_orm_migration::MigratorTrait;

    fn social(id: &str) -> SocialUser {
        SocialUser {
            id: id.to_string(),
            ..Default::default()
        }
    }

    async fn store() -> AccountStore {
        AccountStore::new(create_test_db().await, 4)
    }

    #[test]
    fn test_fallback_email_sanitizes_identity() {
        assert_eq!(fallback_email("telegram", "42 x"), "telegram_42_x@social.local");
        assert_eq!(fallback_email("vk", "a.b-c_d"), "vk_a.b-c_d@social.local");
        assert_eq!(fallback_email("vk", "ü/1"), "vk___1@social.local");
        // 同一输入总是得到同一结果
        assert_eq!(fallback_email("telegram", "42 x"), fallback_email("telegram", "42 x"));
    }

    #[test]
    fn test_display_name_precedence() {
        let mut user = social("1");
        assert_eq!(display_name(&user, "github"), "Github user");

        user.nickname = Some("octo".to_string());
        assert_eq!(display_name(&user, "github"), "octo");

        user.name = Some("Octo Cat".to_string());
        assert_eq!(display_name(&user, "github"), "Octo Cat");

        user.name = Some(String::new());
        assert_eq!(display_name(&user, "github"), "octo");
    }

    #[test]
    fn test_placeholder_password() {
        let password = placeholder_password();
        assert_eq!(password.len(), 40);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_first_or_create_is_idempotent() {
        let store = store().await;

        let first = store.first_or_create_by_email("a@b.com", "A").await.unwrap();
        let second = store.first_or_create_by_email("a@b.com", "Other").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "A");
        assert_eq!(Users::find().count(store.db()).await.unwrap(), 1);
        assert!(bcrypt::verify("wrong", &first.password_hash).is_ok_and(|ok| !ok));
    }

    #[tokio::test]
    async fn test_create_after_lost_race_returns_existing_user() {
        let store = store().await;
        let winner = store.first_or_create_by_email("race@example.com", "Winner").await.unwrap();

        // 查找之后、插入之前邮箱已被另一请求写入
        let loser = store.create_by_email("race@example.com", "Loser").await.unwrap();

        assert_eq!(loser.id, winner.id);
        assert_eq!(loser.name, "Winner");
        assert_eq!(Users::find().count(store.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_login_yields_one_user() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("race.db").display());
        let mut options = ConnectOptions::new(url);
        options.max_connections(4).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let store = AccountStore::new(db, 4);

        let (a, b) = tokio::join!(
            store.first_or_create_by_email("same@example.com", "A"),
            store.first_or_create_by_email("same@example.com", "B"),
        );

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(Users::find().count(store.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_user_without_email_uses_fallback() {
        let store = store().await;

        let user = store.resolve_user(&social("42 x"), "telegram").await.unwrap();
        let again = store.resolve_user(&social("42 x"), "telegram").await.unwrap();

        assert_eq!(user.email, "telegram_42_x@social.local");
        assert_eq!(user.name, "Telegram user");
        assert_eq!(user.id, again.id);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_driver() {
        let store = store().await;
        let user = store.first_or_create_by_email("u@example.com", "U").await.unwrap();

        let mut identity = social("100");
        identity.nickname = Some("first".to_string());
        store.upsert(user.id, "github", &identity).await.unwrap();

        identity.nickname = Some("second".to_string());
        store.upsert(user.id, "github", &identity).await.unwrap();

        let rows = SocialAccounts::find().all(store.db()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username.as_deref(), Some("second"));
        assert_eq!(rows[0].identity, "100");
    }

    #[tokio::test]
    async fn test_sync_display_name_keeps_whitespace_name() {
        let store = store().await;
        let user = store.first_or_create_by_email("w@example.com", " ").await.unwrap();

        let mut identity = social("8");
        identity.nickname = Some("nick".to_string());
        store.sync_display_name(&user, &identity, "Telegram user").await.unwrap();

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.name, " ");
    }

    #[tokio::test]
    async fn test_whitespace_email_is_used_verbatim() {
        let store = store().await;
        let mut identity = social("9");
        identity.email = Some(" ".to_string());

        let user = store.resolve_user(&identity, "github").await.unwrap();
        assert_eq!(user.email, " ");
    }

    #[tokio::test]
    async fn test_sync_display_name_only_fills_empty() {
        let store = store().await;
        let user = store.first_or_create_by_email("t@example.com", "").await.unwrap();

        let mut identity = social("7");
        identity.nickname = Some("tg_user".to_string());
        store.sync_display_name(&user, &identity, "Telegram user").await.unwrap();

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.name, "@tg_user");

        identity.name = Some("Real Name".to_string());
        store.sync_display_name(&user, &identity, "Telegram user").await.unwrap();
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.name, "@tg_user");
    }
}
