//! # 请求处理器

pub mod account;
pub mod socialite;
pub mod system;
