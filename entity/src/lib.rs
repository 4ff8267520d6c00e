//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod social_accounts;
pub mod users;

pub use social_accounts::Entity as SocialAccounts;
pub use users::Entity as Users;
