//! 用户实体上的社交账号关联

use async_trait::async_trait;
use entity::{social_accounts, users};
use sea_orm::{ColumnTrait, ConnectionTrait, ModelTrait, QueryFilter, QueryOrder, Select};

use crate::error::Result;

/// 为宿主的用户实体提供一对多的社交账号关联
#[async_trait]
pub trait HasLinkedIdentities: Sync {
    /// 关联查询，可以继续追加条件
    fn linked_identities_query(&self) -> Select<social_accounts::Entity>;

    async fn linked_identities<C>(&self, db: &C) -> Result<Vec<social_accounts::Model>>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(self.linked_identities_query().all(db).await?)
    }

    async fn linked_identity<C>(&self, db: &C, driver: &str) -> Result<Option<social_accounts::Model>>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(self
            .linked_identities_query()
            .filter(social_accounts::Column::Driver.eq(driver))
            .one(db)
            .await?)
    }
}

impl HasLinkedIdentities for users::Model {
    fn linked_identities_query(&self) -> Select<social_accounts::Entity> {
        self.find_related(social_accounts::Entity)
            .order_by_asc(social_accounts::Column::Driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_test_db, insert_social_account, insert_user};

    #[tokio::test]
    async fn test_linked_identities() {
        let db = create_test_db().await;
        let alice = insert_user(&db, "alice@example.com", "Alice").await;
        let bob = insert_user(&db, "bob@example.com", "Bob").await;
        insert_social_account(&db, alice.id, "telegram", "1").await;
        insert_social_account(&db, alice.id, "github", "2").await;
        insert_social_account(&db, bob.id, "github", "3").await;

        let linked = alice.linked_identities(&db).await.unwrap();
        let drivers: Vec<_> = linked.iter().map(|a| a.driver.as_str()).collect();
        assert_eq!(drivers, vec!["github", "telegram"]);

        let github = alice.linked_identity(&db, "github").await.unwrap().unwrap();
        assert_eq!(github.identity, "2");
        assert!(bob.linked_identity(&db, "telegram").await.unwrap().is_none());
    }
}
