//! 登录态模块
//!
//! 当前用户、访客模式、登录/登出/注销

pub mod context;
pub mod listener;

// 重新导出主要类型
pub use context::{AuthContext, AuthState};
pub use listener::{EmptySessionListener, SessionListener};
