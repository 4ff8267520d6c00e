//! # 测试数据 Fixtures

use chrono::Utc;
use entity::{social_accounts, users, SocialAccounts, Users};
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::socialite::SocialUser;

/// 第三方身份构建器
#[derive(Debug, Clone)]
pub struct SocialUserFixture {
    inner: SocialUser,
}

impl SocialUserFixture {
    pub fn new(id: &str) -> Self {
        Self {
            inner: SocialUser {
                id: id.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn email(mut self, email: &str) -> Self {
        self.inner.email = Some(email.to_string());
        self
    }

    pub fn nickname(mut self, nickname: &str) -> Self {
        self.inner.nickname = Some(nickname.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.inner.name = Some(name.to_string());
        self
    }

    pub fn avatar(mut self, avatar: &str) -> Self {
        self.inner.avatar = Some(avatar.to_string());
        self
    }

    pub fn build(self) -> SocialUser {
        self.inner
    }
}

/// 直接插入一个用户
pub async fn insert_user(db: &DatabaseConnection, email: &str, name: &str) -> users::Model {
    let now = Utc::now().naive_utc();
    let model = users::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = Users::insert(model).exec(db).await.expect("插入测试用户失败");
    Users::find_by_id(result.last_insert_id)
        .one(db)
        .await
        .expect("查询测试用户失败")
        .expect("测试用户不存在")
}

/// 直接插入一条绑定记录
pub async fn insert_social_account(
    db: &DatabaseConnection,
    user_id: i32,
    driver: &str,
    identity: &str,
) -> social_accounts::Model {
    let now = Utc::now().naive_utc();
    let model = social_accounts::ActiveModel {
        user_id: Set(user_id),
        driver: Set(driver.to_string()),
        identity: Set(identity.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = SocialAccounts::insert(model)
        .exec(db)
        .await
        .expect("插入测试绑定记录失败");
    SocialAccounts::find_by_id(result.last_insert_id)
        .one(db)
        .await
        .expect("查询测试绑定记录失败")
        .expect("测试绑定记录不存在")
}
