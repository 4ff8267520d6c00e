//! # Social Link
//!
//! 为 axum + sea-orm 应用提供第三方登录与账号绑定

pub mod config;
pub mod database;
pub mod error;
pub mod linker;
pub mod logging;
pub mod session;
pub mod socialite;
pub mod web;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{LinkError, Result};
