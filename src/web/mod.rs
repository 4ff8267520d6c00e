//! # Web 层
//!
//! 授权跳转、回调以及会话相关接口的 axum 路由

pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{HttpServer, build_router};
pub use state::{AppContext, AppState};
